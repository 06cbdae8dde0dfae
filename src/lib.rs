//! Single-pass regular expression compiler with an NFA frontier simulator.
//!
//! A pattern is scanned once, left to right, and every character
//! immediately adds states and transitions to an arena-backed graph.
//! There is no tokenizer and no syntax tree: the builder keeps a
//! `current` state plus a stack of group entry states, and each token
//! attaches to one of them.
//!
//! # Architecture
//!
//! ```text
//! pattern  ──RegexBuilder::build──>  Regex (states + start)  ──Matcher──>  bool
//! ```
//!
//! ## Construction
//!
//! | Token      | Effect                                                         |
//! |------------|----------------------------------------------------------------|
//! | `(`        | `current -ε-> g`, push `current`, `current = g`                |
//! | `)`        | `current = pop()` (the group's **entry**, not its end)         |
//! | `\|`       | `current -ε-> alt`, `current = alt`                            |
//! | `?`        | `top -ε-> current` and `current -ε-> top`                      |
//! | `+`        | `current -ε-> top`                                             |
//! | `*`        | `top -ε-> current`                                             |
//! | `[..]`     | `current -ε-> head`, one edge per member, `current = head`     |
//! | `\c`       | `current -c-> new`, `current` unchanged                        |
//! | `c`        | `current -c-> new`, `current = new`                            |
//!
//! `top` is the most recently opened group's entry state, or the root
//! state when no group is open.  Every state is accepting except the
//! head of a character class.  The root is always the start state.
//!
//! ## Simulation
//!
//! The default [`Simulation::SingleHop`] keeps an ordered frontier with
//! duplicates.  For every input symbol each frontier state contributes
//! its targets on that symbol **and** its `ε` targets, one hop deep.
//! The input is accepted when any state of the final frontier is
//! accepting.  [`Simulation::Closure`] is the opt-in textbook variant
//! that follows `ε` edges to a fixed point and deduplicates.
//!
//! ```
//! let re = regex_nfa_sim::compile(r"\*").unwrap();
//! assert!(regex_nfa_sim::matches(&re, "*"));
//! assert!(!regex_nfa_sim::matches(&re, "a"));
//! assert!(regex_nfa_sim::compile(r"a\").is_err());
//! ```

#[macro_use]
mod macros;

use std::fmt;
use std::io::{self, Write};
use std::iter::Peekable;
use std::ops::{Index, IndexMut};
use std::str::CharIndices;

use indexmap::IndexMap;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// An error returned when a pattern cannot be compiled.
///
/// Only a dangling escape is rejected.  Unbalanced parentheses,
/// unterminated classes and empty branches all compile to *some*
/// automaton.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The pattern ends with a `\` that has nothing left to escape.
    /// `offset` is the byte offset of that backslash.
    UnterminatedEscape { offset: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedEscape { offset } => write!(
                f,
                "invalid escape sequence at the end of the pattern (offset {})",
                offset
            ),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transition keys
// ---------------------------------------------------------------------------

/// The key of a transition: a literal input character or `ε`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Consumes exactly this character.
    Char(char),
    /// Taken without reading a character of its own.
    Epsilon,
}

impl Symbol {
    /// Dot-graph label for this symbol.
    fn label(self) -> String {
        match self {
            Symbol::Char('"') => "\\\"".to_string(),
            Symbol::Char('\\') => "\\\\".to_string(),
            Symbol::Char(c) => c.to_string(),
            Symbol::Epsilon => "ε".to_string(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{}", c),
            Symbol::Epsilon => f.write_str("ε"),
        }
    }
}

// ---------------------------------------------------------------------------
// NFA states
// ---------------------------------------------------------------------------

/// Index into the NFA state arena ([`Regex::state`]).
///
/// Handles are only meaningful for the [`Regex`] that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIdx(u32);

impl StateIdx {
    /// Return the raw index as `usize`.
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `states[state_idx]` — typed access to the NFA state array.
impl Index<StateIdx> for [State] {
    type Output = State;

    #[inline]
    fn index(&self, idx: StateIdx) -> &State {
        &self[idx.idx()]
    }
}

impl IndexMut<StateIdx> for [State] {
    #[inline]
    fn index_mut(&mut self, idx: StateIdx) -> &mut State {
        &mut self[idx.idx()]
    }
}

/// A single NFA state.
///
/// `transitions` is a multi-map: one symbol may lead to several targets,
/// kept in the order the builder added them.
#[derive(Clone, Debug)]
pub struct State {
    accepting: bool,
    transitions: IndexMap<Symbol, Vec<StateIdx>>,
}

impl State {
    fn new(accepting: bool) -> Self {
        Self {
            accepting,
            transitions: IndexMap::new(),
        }
    }

    /// Whether the input is accepted when this state is in the final
    /// frontier.
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Targets reachable on `symbol`, in insertion order.
    #[inline]
    pub fn targets(&self, symbol: Symbol) -> &[StateIdx] {
        self.transitions
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every outgoing edge as `(symbol, target)`, grouped by symbol in the
    /// order each symbol was first used.
    pub fn transitions(&self) -> impl Iterator<Item = (Symbol, StateIdx)> + '_ {
        self.transitions
            .iter()
            .flat_map(|(&symbol, targets)| targets.iter().map(move |&target| (symbol, target)))
    }

    fn add_transition(&mut self, symbol: Symbol, next: StateIdx) {
        self.transitions.entry(symbol).or_default().push(next);
    }
}

#[derive(Clone)]
struct StateList(Box<[State]>);

impl fmt::Debug for StateList {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.0.iter().enumerate()).finish()
    }
}

impl std::ops::Deref for StateList {
    type Target = [State];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How [`Matcher::step`] advances the frontier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Simulation {
    /// For each frontier state, append its targets on the input symbol
    /// followed by its `ε` targets.  `ε` edges are followed one hop deep
    /// and in the same step as the symbol; duplicates are kept.
    #[default]
    SingleHop,
    /// Thompson simulation: the frontier is the deduplicated `ε`-closure
    /// of the states reached on the input symbol, and the initial
    /// frontier is the closure of the start state.
    Closure,
}

// ---------------------------------------------------------------------------
// Compiled regex
// ---------------------------------------------------------------------------

/// A compiled NFA ready for matching.
///
/// Immutable once built.  Matching only reads it, so a `Regex` can be
/// shared between threads; scratch space lives in [`MatcherMemory`].
#[derive(Clone, Debug)]
pub struct Regex {
    states: StateList,
    start: StateIdx,
    simulation: Simulation,
}

impl Regex {
    /// Compile `pattern` with the default configuration.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        RegexBuilder::new().build(pattern)
    }

    /// The start state (the root created before the first token).
    #[inline]
    pub fn start(&self) -> StateIdx {
        self.start
    }

    /// Look up a state.
    ///
    /// # Panics
    ///
    /// Panics if `idx` was not produced by this regex.
    #[inline]
    pub fn state(&self, idx: StateIdx) -> &State {
        &self.states[idx]
    }

    /// Number of states built, reachable or not.
    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The simulation strategy chosen at build time.
    #[inline]
    pub fn simulation(&self) -> Simulation {
        self.simulation
    }

    /// States reachable from [`start`](Self::start) along any edge, in
    /// depth-first order starting with `start`.
    ///
    /// States outside this list can never enter a frontier.
    pub fn live_states(&self) -> Vec<StateIdx> {
        let mut visited = vec![false; self.states.len()];
        let mut live = Vec::new();
        let mut stack = vec![self.start];
        while let Some(s) = stack.pop() {
            if visited[s.idx()] {
                continue;
            }
            visited[s.idx()] = true;
            live.push(s);
            let targets: Vec<StateIdx> = self.states[s].transitions().map(|(_, t)| t).collect();
            stack.extend(targets.into_iter().rev());
        }
        live
    }

    /// Run the whole of `input` through a fresh [`Matcher`].
    pub fn is_match(&self, input: &str) -> bool {
        let mut memory = MatcherMemory::default();
        let mut matcher = memory.matcher(self);
        for c in input.chars() {
            if matcher.is_dead() {
                return false;
            }
            matcher.step(c);
        }
        matcher.finish()
    }

    /// Emit a Graphviz DOT representation of the live part of the NFA.
    pub fn to_dot(&self, mut buffer: impl Write) -> io::Result<()> {
        writeln!(buffer, "digraph nfa {{")?;
        writeln!(buffer, "\trankdir=LR;")?;
        writeln!(buffer, "\t{} [shape=box];", self.start)?;
        for idx in self.live_states() {
            let state = &self.states[idx];
            if state.accepting {
                writeln!(buffer, "\t{} [peripheries=2];", idx)?;
            }
            for (symbol, target) in state.transitions() {
                writeln!(
                    buffer,
                    "\t{} -> {} [label=\"{}\"];",
                    idx,
                    target,
                    symbol.label()
                )?;
            }
        }
        writeln!(buffer, "}}")
    }
}

/// Compile `pattern` into a [`Regex`].
pub fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern)
}

/// Decide whether `regex` accepts `input`.  Never fails.
pub fn matches(regex: &Regex, input: &str) -> bool {
    regex.is_match(input)
}

// ---------------------------------------------------------------------------
// NFA builder (pattern text -> NFA, single pass)
// ---------------------------------------------------------------------------

/// Builds a compiled [`Regex`] from pattern text.
///
/// The root state is the implicit bottom of the group stack: it is the
/// quantifier anchor while no group is open, the target of an unmatched
/// `)`, and the start state of the result.
#[derive(Debug, Default)]
pub struct RegexBuilder {
    states: Vec<State>,
    /// Entry states of the currently open groups, innermost last.
    groups: Vec<StateIdx>,
    simulation: Simulation,
}

impl RegexBuilder {
    /// A builder with the default [`Simulation::SingleHop`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the simulation strategy stored in every [`Regex`] built
    /// from now on.
    pub fn simulation(&mut self, simulation: Simulation) -> &mut Self {
        self.simulation = simulation;
        self
    }

    // -- Low-level NFA construction helpers ----------------------------------

    /// Push a new NFA state and return its index.
    fn state(&mut self, accepting: bool) -> StateIdx {
        let idx = StateIdx(self.states.len() as u32);
        self.states.push(State::new(accepting));
        idx
    }

    fn link(&mut self, from: StateIdx, symbol: Symbol, to: StateIdx) {
        self.states.as_mut_slice()[from].add_transition(symbol, to);
    }

    /// Entry state of the innermost open group.
    fn entry(&self, root: StateIdx) -> StateIdx {
        self.groups.last().copied().unwrap_or(root)
    }

    /// Build a character class whose `[` was just consumed and return its
    /// head state.  The closing `]` is left in the cursor, so the main loop
    /// reads it as a literal.
    fn class(&mut self, current: StateIdx, cursor: &mut Peekable<CharIndices<'_>>) -> StateIdx {
        let head = self.state(false);
        let negate = cursor.next_if(|&(_, c)| c == '^').is_some();
        while let Some((_, member)) = cursor.next_if(|&(_, c)| c != ']') {
            let next = self.state(true);
            self.link(head, Symbol::Char(member), next);
        }
        if negate {
            let bypass = self.state(true);
            self.link(head, Symbol::Epsilon, bypass);
        }
        self.link(current, Symbol::Epsilon, head);
        head
    }

    /// Compile `pattern` into a ready-to-match [`Regex`].
    pub fn build(&mut self, pattern: &str) -> Result<Regex, Error> {
        self.states.clear();
        self.groups.clear();

        let root = self.state(true);
        let mut current = root;
        let mut cursor = pattern.char_indices().peekable();

        while let Some((offset, c)) = cursor.next() {
            current = match c {
                '(' => {
                    let group = self.state(true);
                    self.link(current, Symbol::Epsilon, group);
                    self.groups.push(current);
                    group
                }
                ')' => self.groups.pop().unwrap_or(root),
                '|' => {
                    let alt = self.state(true);
                    self.link(current, Symbol::Epsilon, alt);
                    alt
                }
                '?' => {
                    let entry = self.entry(root);
                    self.link(entry, Symbol::Epsilon, current);
                    self.link(current, Symbol::Epsilon, entry);
                    current
                }
                '+' => {
                    let entry = self.entry(root);
                    self.link(current, Symbol::Epsilon, entry);
                    current
                }
                '*' => {
                    let entry = self.entry(root);
                    self.link(entry, Symbol::Epsilon, current);
                    current
                }
                '[' => self.class(current, &mut cursor),
                '\\' => {
                    let Some((_, escaped)) = cursor.next() else {
                        return Err(Error::UnterminatedEscape { offset });
                    };
                    let next = self.state(true);
                    self.link(current, Symbol::Char(escaped), next);
                    current
                }
                literal => {
                    let next = self.state(true);
                    self.link(current, Symbol::Char(literal), next);
                    next
                }
            };
        }

        let regex = Regex {
            states: StateList(std::mem::take(&mut self.states).into_boxed_slice()),
            start: root,
            simulation: self.simulation,
        };
        debug!(
            "compiled {:?}: {} states ({} live), {:?}",
            pattern,
            regex.state_count(),
            regex.live_states().len(),
            regex.simulation,
        );
        Ok(regex)
    }
}

// ---------------------------------------------------------------------------
// Matcher (NFA simulation)
// ---------------------------------------------------------------------------

/// Reusable memory for [`Matcher`].  Create once, call
/// [`matcher`](Self::matcher) for each input to match.
#[derive(Debug, Default)]
pub struct MatcherMemory {
    /// Current and next frontiers (swapped each step).
    clist: Vec<StateIdx>,
    nlist: Vec<StateIdx>,
    /// Per-state: the `listid` when the state was last added.  Only used
    /// by [`Simulation::Closure`].
    lastlist: Vec<usize>,
    /// Worklist for the `ε`-closure walk.
    stack: Vec<StateIdx>,
}

impl MatcherMemory {
    /// Reset this memory for `regex` and return a matcher seeded with its
    /// start state.
    pub fn matcher<'a>(&'a mut self, regex: &'a Regex) -> Matcher<'a> {
        self.clist.clear();
        self.nlist.clear();
        self.lastlist.clear();
        self.lastlist.resize(regex.states.len(), usize::MAX);
        self.stack.clear();

        let mut m = Matcher {
            states: &regex.states,
            simulation: regex.simulation,
            clist: &mut self.clist,
            nlist: &mut self.nlist,
            lastlist: &mut self.lastlist,
            stack: &mut self.stack,
            listid: 0,
        };

        m.startlist(regex.start);
        m
    }
}

/// Runs the frontier simulation over one input, one character at a time.
#[derive(Debug)]
pub struct Matcher<'a> {
    states: &'a [State],
    simulation: Simulation,
    /// Current frontier.
    clist: &'a mut Vec<StateIdx>,
    /// Next frontier (built during a step).
    nlist: &'a mut Vec<StateIdx>,
    /// Per-state deduplication stamp (compared against `listid`).
    lastlist: &'a mut [usize],
    /// Pending states of the current `ε`-closure walk.
    stack: &'a mut Vec<StateIdx>,
    /// Monotonically increasing step ID.
    listid: usize,
}

impl<'a> Matcher<'a> {
    /// Seed the frontier with `start` (plus its closure in
    /// [`Simulation::Closure`]).
    fn startlist(&mut self, start: StateIdx) {
        match self.simulation {
            Simulation::SingleHop => self.clist.push(start),
            Simulation::Closure => {
                self.addstate(start);
                std::mem::swap(self.clist, self.nlist);
                self.listid += 1;
            }
        }
    }

    /// Stamp `idx` for the current step.  Returns `false` if it was
    /// already stamped.
    #[inline]
    fn mark(&mut self, idx: StateIdx) -> bool {
        let i = idx.idx();
        if self.lastlist[i] == self.listid {
            return false;
        }
        self.lastlist[i] = self.listid;
        true
    }

    /// Add `idx` and everything reachable from it over `ε` edges to
    /// `nlist`, each state at most once per step.
    ///
    /// Walks an explicit stack in depth-first order; `ε` chains are as
    /// long as the pattern, e.g. one hop per `(`.
    fn addstate(&mut self, idx: StateIdx) {
        if !self.mark(idx) {
            return;
        }
        self.stack.push(idx);

        let states = self.states;
        while let Some(idx) = self.stack.pop() {
            self.nlist.push(idx);
            for &next in states[idx].targets(Symbol::Epsilon).iter().rev() {
                if self.mark(next) {
                    self.stack.push(next);
                }
            }
        }
    }

    /// Advance the simulation by one input character.
    pub fn step(&mut self, c: char) {
        let states = self.states;
        self.nlist.clear();

        match self.simulation {
            Simulation::SingleHop => {
                for &idx in self.clist.iter() {
                    let state = &states[idx];
                    self.nlist.extend_from_slice(state.targets(Symbol::Char(c)));
                    self.nlist.extend_from_slice(state.targets(Symbol::Epsilon));
                }
            }
            Simulation::Closure => {
                let clist = std::mem::take(self.clist);
                for &idx in &clist {
                    for &next in states[idx].targets(Symbol::Char(c)) {
                        self.addstate(next);
                    }
                }
                *self.clist = clist;
                self.listid += 1;
            }
        }

        std::mem::swap(self.clist, self.nlist);
        trace!("step {:?}: frontier holds {} states", c, self.clist.len());
    }

    /// The current frontier, in the order states were added.
    #[inline]
    pub fn frontier(&self) -> &[StateIdx] {
        &self.clist[..]
    }

    /// `true` once the frontier is empty; no further input can be
    /// accepted.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.clist.is_empty()
    }

    /// Whether the input consumed so far is accepted.
    pub fn is_accepting(&self) -> bool {
        self.clist.iter().any(|&idx| self.states[idx].accepting)
    }

    /// Signal end-of-input and return the verdict.
    pub fn finish(self) -> bool {
        self.is_accepting()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
