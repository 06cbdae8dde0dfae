use regex_nfa_sim::{Matcher, MatcherMemory, Regex, RegexBuilder, Simulation};

use std::io::{self, BufRead, Write};
use std::process;

const HELP: &str = "\
renfa - compile a pattern to an NFA and run its frontier simulation

usage:
  renfa [--closure] [--debug]                      prompt for a pattern and an input
  renfa [--closure] [--debug] match PATTERN INPUT...
  renfa dot PATTERN                                Graphviz source of the automaton

flags:
  --closure   follow epsilon edges to a fixed point, deduplicating the frontier
  --debug     trace the frontier on stderr after every input character
  -h, --help  show this text

RUST_LOG=debug or RUST_LOG=trace enables library logging.";

/// What to run, as read from the command line.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    mode: Mode,
    simulation: Simulation,
    trace: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Prompt,
    Dot { pattern: String },
    Match { pattern: String, inputs: Vec<String> },
}

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    Help,
    Usage(String),
}

fn parse_args<I>(args: I) -> Result<Invocation, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut simulation = Simulation::SingleHop;
    let mut trace = false;
    let mut words = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Err(ArgsError::Help),
            "--closure" => simulation = Simulation::Closure,
            "--debug" => trace = true,
            flag if flag.len() > 1 && flag.starts_with('-') => {
                return Err(ArgsError::Usage(format!("unrecognized flag `{flag}`")));
            }
            _ => words.push(arg),
        }
    }

    let mut words = words.into_iter();
    let mode = match words.next().as_deref() {
        None => Mode::Prompt,
        Some("dot") => {
            if simulation != Simulation::SingleHop || trace {
                return Err(ArgsError::Usage(
                    "`dot` draws the automaton only; --closure and --debug do not apply".into(),
                ));
            }
            match (words.next(), words.next()) {
                (Some(pattern), None) => Mode::Dot { pattern },
                _ => return Err(ArgsError::Usage("`dot` expects one PATTERN".into())),
            }
        }
        Some("match") => {
            let pattern = words.next();
            let inputs: Vec<String> = words.collect();
            match pattern {
                Some(pattern) if !inputs.is_empty() => Mode::Match { pattern, inputs },
                _ => {
                    return Err(ArgsError::Usage(
                        "`match` expects a PATTERN and at least one INPUT".into(),
                    ));
                }
            }
        }
        Some(other) => return Err(ArgsError::Usage(format!("no such command `{other}`"))),
    };

    Ok(Invocation {
        mode,
        simulation,
        trace,
    })
}

fn trace_frontier(label: &str, matcher: &Matcher<'_>) {
    let ids = matcher
        .frontier()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    eprintln!("{label:>8} | {ids}");
}

/// Run `regex` over `input` and return the verdict with the size of the
/// final frontier.
fn run_input(memory: &mut MatcherMemory, regex: &Regex, input: &str, trace: bool) -> (bool, usize) {
    let mut matcher = memory.matcher(regex);
    if trace {
        trace_frontier("start", &matcher);
    }
    for c in input.chars() {
        matcher.step(c);
        if trace {
            trace_frontier(&format!("{c:?}"), &matcher);
        }
    }
    let size = matcher.frontier().len();
    (matcher.finish(), size)
}

fn compile_or_exit(pattern: &str, simulation: Simulation) -> Regex {
    match RegexBuilder::new().simulation(simulation).build(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_dot(pattern: &str) {
    let regex = compile_or_exit(pattern, Simulation::SingleHop);
    let mut out = io::stdout().lock();
    if let Err(e) = regex.to_dot(&mut out).and_then(|()| out.flush()) {
        eprintln!("Error: cannot write graph: {e}");
        process::exit(1);
    }
}

fn run_match(pattern: &str, inputs: &[String], simulation: Simulation, trace: bool) {
    let regex = compile_or_exit(pattern, simulation);
    let mut memory = MatcherMemory::default();

    let mut rejected = 0;
    for input in inputs {
        let (accepted, size) = run_input(&mut memory, &regex, input, trace);
        let verdict = if accepted { "accept" } else { "reject" };
        println!("{verdict} {input:?} (frontier {size})");
        if !accepted {
            rejected += 1;
        }
    }

    if rejected > 0 {
        process::exit(1);
    }
}

/// Print `question` and read one line, without its line terminator.
fn prompt(input: &mut impl BufRead, question: &str) -> io::Result<String> {
    let mut out = io::stdout().lock();
    write!(out, "{question}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn run_prompt(simulation: Simulation, trace: bool) {
    let mut stdin = io::stdin().lock();
    let request = prompt(&mut stdin, "Enter the regular expression: ").and_then(|pattern| {
        let text = prompt(&mut stdin, "Enter the input string: ")?;
        Ok((pattern, text))
    });
    let (pattern, text) = request.unwrap_or_else(|e| {
        eprintln!("Error: cannot read stdin: {e}");
        process::exit(1);
    });

    if pattern.is_empty() || text.is_empty() {
        eprintln!("Error: Invalid input. Both regex and input string are required.");
        process::exit(1);
    }

    let regex = compile_or_exit(&pattern, simulation);
    let (result, _) = run_input(&mut MatcherMemory::default(), &regex, &text, trace);
    println!("Matching result for '{text}' with regex '{pattern}': {result}");
}

fn main() {
    #[cfg(feature = "logging")]
    env_logger::init();

    let invocation = match parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(ArgsError::Help) => {
            println!("{HELP}");
            return;
        }
        Err(ArgsError::Usage(msg)) => {
            eprintln!("Error: {msg}\n\n{HELP}");
            process::exit(2);
        }
    };

    let Invocation {
        mode,
        simulation,
        trace,
    } = invocation;
    match mode {
        Mode::Prompt => run_prompt(simulation, trace),
        Mode::Dot { pattern } => run_dot(&pattern),
        Mode::Match { pattern, inputs } => run_match(&pattern, &inputs, simulation, trace),
    }
}
