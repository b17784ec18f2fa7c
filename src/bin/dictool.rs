use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};

use lex_fsa::fsa::builder::build_from_entries;
use lex_fsa::{Dictionary, Match, MatchIterator, ValueKind};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Parser)]
#[command(name = "dictool", about = "lex_fsa dictionary build and query tool")]
struct Cli {
    /// Custom settings TOML applied before any command runs
    #[arg(long, global = true)]
    settings: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a TSV file (key<TAB>score[<TAB>value]) into a dictionary
    Compile {
        /// Value encoding: key_only, string, int, json or raw
        #[arg(long, default_value = "string")]
        kind: ValueKind,
        /// Input TSV file ("-" for stdin)
        input: String,
        /// Output dictionary file
        output_file: String,
    },
    /// Show dictionary statistics
    Info {
        /// Dictionary file
        dict_file: String,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Exact lookup
    Get {
        /// Dictionary file
        dict_file: String,
        /// Key to look up
        key: String,
    },
    /// Ranked prefix completion
    Complete {
        /// Dictionary file
        dict_file: String,
        /// Prefix to complete
        prefix: String,
        /// Number of results (default: completion.max_results)
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Ranked completion of keys with a prefix close to the query
    Fuzzy {
        /// Dictionary file
        dict_file: String,
        /// Query with possible typos
        query: String,
        /// Edit budget (default: completion.fuzzy_max_edits)
        #[arg(short = 'k', long)]
        max_edits: Option<u32>,
        /// Number of results (default: completion.max_results)
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Print every entry as TSV in key order
    Dump {
        /// Dictionary file
        dict_file: String,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = &cli.settings {
        let content = die!(fs::read_to_string(path), "Error reading {path}: {}");
        die!(lex_fsa::settings::init_custom(content), "Error: {}");
    }

    match cli.command {
        Command::Compile {
            kind,
            input,
            output_file,
        } => compile(kind, &input, &output_file),
        Command::Info { dict_file, json } => info(&dict_file, json),
        Command::Get { dict_file, key } => get(&dict_file, &key),
        Command::Complete {
            dict_file,
            prefix,
            n,
        } => {
            let dict = open(&dict_file);
            print_matches(dict.complete(&prefix), limit(n));
        }
        Command::Fuzzy {
            dict_file,
            query,
            max_edits,
            n,
        } => {
            let dict = open(&dict_file);
            let k = max_edits.unwrap_or(lex_fsa::settings::settings().completion.fuzzy_max_edits);
            print_matches(dict.fuzzy_complete(&query, k), limit(n));
        }
        Command::Dump { dict_file } => dump(&dict_file),
        Command::SettingsExport => print!("{}", lex_fsa::settings::default_toml()),
        Command::SettingsValidate { file } => settings_validate(&file),
    }
}

fn open(dict_file: &str) -> Dictionary {
    die!(
        Dictionary::open(Path::new(dict_file)),
        "Error opening {dict_file}: {}"
    )
}

fn limit(n: Option<usize>) -> usize {
    n.unwrap_or(lex_fsa::settings::settings().completion.max_results)
}

/// One parsed TSV line.
type Entry = (String, f64, Vec<u8>);

fn parse_line(kind: ValueKind, line: &str) -> Result<Entry, String> {
    let mut fields = line.splitn(3, '\t');
    let key = fields.next().unwrap_or_default();
    let score = fields
        .next()
        .ok_or_else(|| "missing score column".to_string())?;
    let score: f64 = score
        .trim()
        .parse()
        .map_err(|e| format!("bad score '{score}': {e}"))?;
    let value = fields.next().unwrap_or("");
    let payload = kind.encode_text(value).map_err(|e| e.to_string())?;
    Ok((key.to_string(), score, payload))
}

fn read_entries(kind: ValueKind, reader: impl BufRead) -> Result<Vec<Entry>, String> {
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("line {}: {e}", i + 1))?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(parse_line(kind, &line).map_err(|e| format!("line {}: {e}", i + 1))?);
    }
    Ok(entries)
}

fn compile(kind: ValueKind, input: &str, output_file: &str) {
    let entries = if input == "-" {
        read_entries(kind, io::stdin().lock())
    } else {
        let file = die!(fs::File::open(input), "Error reading {input}: {}");
        read_entries(kind, BufReader::new(file))
    };
    let entries = die!(entries, "Error parsing {input}: {}");

    eprintln!("Building automaton from {} entries...", entries.len());
    let builder = die!(build_from_entries(kind, entries), "Error building: {}");
    let key_count = builder.len();
    die!(
        builder.save(Path::new(output_file)),
        "Error writing dictionary: {}"
    );

    let size = fs::metadata(output_file).map(|m| m.len()).unwrap_or(0);
    eprintln!("Wrote {output_file} ({key_count} keys, {size} bytes)");
}

fn info(dict_file: &str, json: bool) {
    let dict = open(dict_file);
    if json {
        println!("{}", dict.statistics());
        return;
    }
    let s = dict.stats();
    println!("Format:       LXFA v{}", s.version);
    println!("Value kind:   {}", s.value_kind);
    println!("Keys:         {}", s.key_count);
    println!(
        "States:       {} ({} final)",
        s.state_count, s.final_state_count
    );
    println!("Transitions:  {}", s.transition_count);
    println!("Value slots:  {}", s.value_count);
    println!("Longest key:  {} bytes", s.max_key_len);
    match s.max_score {
        Some(score) => println!("Best score:   {score}"),
        None => println!("Best score:   -"),
    }
    println!("Size:         {} bytes", s.byte_len);
}

fn get(dict_file: &str, key: &str) {
    let dict = open(dict_file);
    let m = dict.get(key);
    if m.is_empty() {
        eprintln!("Not found: {key}");
        process::exit(1);
    }
    print_match(&mut io::stdout().lock(), &m);
}

fn print_match(out: &mut impl Write, m: &Match) {
    // A closed pipe (e.g. `| head`) ends the output quietly.
    let _ = writeln!(
        out,
        "{}\t{}\t{}",
        m.matched_string(),
        m.score(),
        m.value_as_string()
    );
}

fn print_matches(results: MatchIterator, n: usize) {
    let mut out = io::stdout().lock();
    let mut shown = 0;
    for m in results.take(n) {
        print_match(&mut out, &m);
        shown += 1;
    }
    if shown == 0 {
        eprintln!("No completions");
    }
}

fn dump(dict_file: &str) {
    let dict = open(dict_file);
    let mut out = io::stdout().lock();
    for m in dict.iter() {
        print_match(&mut out, &m);
    }
}

fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        lex_fsa::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: open.verify_checksum={}, completion.max_results={}, completion.fuzzy_max_edits={}, build.dedup_values={}",
        s.open.verify_checksum,
        s.completion.max_results,
        s.completion.fuzzy_max_edits,
        s.build.dedup_values
    );
}
