use std::{path::PathBuf, str::FromStr};

use anyhow::Context as _;

use abnf::{ast::Visitor, Context, Cursor, ErrorCode, NumberFlag};

fn main() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let level = log::LevelFilter::from_str(&level).unwrap_or(log::LevelFilter::Info);

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )
    .unwrap();

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let mut do_events = false;
    let mut do_rules = false;
    let mut do_bench = false;
    let mut bench_iters = 1u32;
    let mut max_quoted = 0usize;

    let mut files = Vec::new();
    let mut iter = args.iter().map(String::as_str);

    while let Some(arg) = iter.next() {
        match arg {
            "--events" => do_events = true,
            "--rules" => do_rules = true,
            "--bench" => do_bench = true,
            "--iters" => {
                bench_iters = iter
                    .next()
                    .context("--iters expects an argument")?
                    .parse()
                    .context("--iters expects a number")?;
            }
            "--max-quoted" => {
                max_quoted = iter
                    .next()
                    .context("--max-quoted expects an argument")?
                    .parse()
                    .context("--max-quoted expects a number")?;
            }
            _ => files.push(arg),
        }
    }

    anyhow::ensure!(files.len() == 1, "expected exactly one grammar file");
    let path = PathBuf::from(files.pop().unwrap());

    let src = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;

    if do_bench {
        bench("parse", src.len(), bench_iters, || abnf::parse(&src));
    }

    if do_events {
        let mut s = Cursor::new(&src);
        let mut printer = EventPrinter::default();
        abnf::parser::rulelist(&mut s, &mut printer);
    }

    let tree = abnf::parse_with_limit(&src, max_quoted);

    if let Some(err) = tree.error() {
        anyhow::bail!("{}: {err}", path.display());
    }
    if tree.consumed() as usize != src.len() {
        let line = src[..tree.consumed() as usize].split('\n').count();
        anyhow::bail!("{}: parse is incomplete at line {line}", path.display());
    }

    if do_rules {
        let mut inventory = RuleInventory::default();
        tree.traverse(&mut inventory);
    }

    log::info!("{}: {} rules", path.display(), tree.rules_count());

    Ok(())
}

fn bench<T>(name: &str, len_bytes: usize, iters: u32, mut fun: impl FnMut() -> T) {
    let start = std::time::Instant::now();
    for _ in 0..iters {
        std::hint::black_box(fun());
    }
    let elapsed = (start.elapsed() / iters.max(1)).as_secs_f64();

    eprintln!(
        "{name:8} {:.2} ms/MiB",
        (elapsed * 1000.0 * 1024.0 * 1024.0) / len_bytes.max(1) as f64
    );
}

/// Prints the raw combinator event stream, indented by nesting depth.
#[derive(Default)]
struct EventPrinter {
    depth: usize,
}

impl EventPrinter {
    fn begin(&mut self, label: &str) -> bool {
        println!("{:indent$}begin {label}", "", indent = self.depth * 2);
        self.depth += 1;
        true
    }

    fn end(&mut self, label: &str, success: bool) -> bool {
        self.depth = self.depth.saturating_sub(1);
        let outcome = if success { "ok" } else { "failed" };
        println!("{:indent$}end {label} ({outcome})", "", indent = self.depth * 2);
        success
    }

    fn leaf(&mut self, text: impl std::fmt::Display) -> bool {
        println!("{:indent$}{text}", "", indent = self.depth * 2);
        true
    }
}

impl Context for EventPrinter {
    fn error(&mut self, code: ErrorCode, line: u32) {
        log::warn!("line {line}: {code}");
    }
    fn begin_document(&mut self) -> bool {
        self.begin("document")
    }
    fn end_document(&mut self, success: bool) -> bool {
        self.end("document", success)
    }
    fn begin_rule(&mut self, name: &str, incremental: bool, _line: u32) -> bool {
        let kind = if incremental { "rule =/" } else { "rule =" };
        self.begin(&format!("{kind} {name}"))
    }
    fn end_rule(&mut self, _name: &str, _incremental: bool, success: bool) -> bool {
        self.end("rule", success)
    }
    fn begin_alternation(&mut self) -> bool {
        self.begin("alternation")
    }
    fn end_alternation(&mut self, success: bool) -> bool {
        self.end("alternation", success)
    }
    fn begin_concatenation(&mut self) -> bool {
        self.begin("concatenation")
    }
    fn end_concatenation(&mut self, success: bool) -> bool {
        self.end("concatenation", success)
    }
    fn begin_repetition(&mut self) -> bool {
        self.begin("repetition")
    }
    fn end_repetition(&mut self, success: bool) -> bool {
        self.end("repetition", success)
    }
    fn repeat(&mut self, min: u64, max: Option<u64>) -> bool {
        match max {
            Some(max) => self.leaf(format_args!("repeat {min}..{max}")),
            None => self.leaf(format_args!("repeat {min}..")),
        }
    }
    fn begin_group(&mut self) -> bool {
        self.begin("group")
    }
    fn end_group(&mut self, success: bool) -> bool {
        self.end("group", success)
    }
    fn begin_option(&mut self) -> bool {
        self.begin("option")
    }
    fn end_option(&mut self, success: bool) -> bool {
        self.end("option", success)
    }
    fn rulename(&mut self, name: &str) -> bool {
        self.leaf(format_args!("rulename {name}"))
    }
    fn first_number(&mut self, flag: NumberFlag, text: &str) -> bool {
        self.leaf(format_args!("first number {flag:?} {text}"))
    }
    fn next_number(&mut self, _flag: NumberFlag, text: &str) -> bool {
        self.leaf(format_args!("next number {text}"))
    }
    fn last_number(&mut self, _flag: NumberFlag, text: &str) -> bool {
        if text.is_empty() {
            self.leaf("number done")
        } else {
            self.leaf(format_args!("last number {text}"))
        }
    }
    fn prose(&mut self, text: &str) -> bool {
        self.leaf(format_args!("prose <{text}>"))
    }
    fn quoted_string(&mut self, text: &str) -> bool {
        self.leaf(format_args!("quoted {text:?}"))
    }
    fn comment(&mut self, text: &str) -> bool {
        self.leaf(format_args!("comment ;{text}"))
    }
}

/// Prints one line per rule, with the names the rule body references.
#[derive(Default)]
struct RuleInventory {
    current: Option<String>,
    references: Vec<String>,
}

impl RuleInventory {
    fn flush(&mut self) {
        if let Some(name) = self.current.take() {
            let refs = self.references.join(" ");
            self.references.clear();
            if refs.is_empty() {
                println!("{name}");
            } else {
                println!("{name}: {refs}");
            }
        }
    }
}

impl Visitor for RuleInventory {
    fn begin_rule(&mut self, name: &str) {
        self.current = Some(name.to_owned());
    }
    fn end_rule(&mut self) {
        self.flush();
    }
    fn rulename(&mut self, name: &str) {
        if !self.references.iter().any(|r| r == name) {
            self.references.push(name.to_owned());
        }
    }
}
