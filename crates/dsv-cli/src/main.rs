use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

use dsv_core::DumpOpts;
use dsv_core::scan::find_store_files;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(Parser, Debug)]
#[command(
    name = "dsv-cli",
    about = "Dump Finder .DS_Store files as text or JSON",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Dump a file (or every .DS_Store under a directory) as text
    Dump(DumpArgs),
    /// Dump a file (or every .DS_Store under a directory) as JSON
    Json(DumpArgs),
    /// List .DS_Store files under a directory
    Scan(ScanArgs),
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    /// File or directory to dump (defaults to ./.DS_Store)
    path: Option<PathBuf>,
    /// Descend into subdirectories when PATH is a directory
    #[arg(short, long, default_value_t = false)]
    recursive: bool,
    /// Max tree depth to print
    #[arg(long, default_value_t = 16)]
    max_depth: usize,
    /// Blobs longer than this are shown as a byte count
    #[arg(long, default_value_t = 32)]
    max_blob_bytes: usize,
    /// Emit full blob bytes instead of summaries
    #[arg(long, default_value_t = false)]
    full_blobs: bool,
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    /// Directory to search
    #[arg(default_value = ".")]
    dir: PathBuf,
    /// Max directory depth (unbounded if omitted)
    #[arg(long)]
    depth: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd.unwrap_or(Cmd::Dump(DumpArgs {
        path: None,
        recursive: false,
        max_depth: 16,
        max_blob_bytes: 32,
        full_blobs: false,
    })) {
        Cmd::Dump(a) => cmd_dump(a, false),
        Cmd::Json(a) => cmd_dump(a, true),
        Cmd::Scan(a) => cmd_scan(a),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => None,
        1 => Some("dsv_core=debug"),
        _ => Some("dsv_core=trace"),
    };
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Some(directive) = level.and_then(|l| l.parse::<Directive>().ok()) {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_dump(args: DumpArgs, as_json: bool) {
    let path = args.path.unwrap_or_else(|| PathBuf::from(".DS_Store"));
    let opts = DumpOpts {
        max_depth: args.max_depth,
        max_blob_bytes: args.max_blob_bytes,
        blob_summary: !args.full_blobs,
    };
    let walk_depth = if args.recursive { None } else { Some(1) };
    let p = path.as_path();
    if p.is_dir() {
        if as_json {
            let v = dsv_core::dump::dump_dir_json(p, walk_depth, opts);
            print_json(&v);
        } else {
            print!("{}", dsv_core::dump::dump_dir_text(p, walk_depth, opts));
        }
        return;
    }
    if !p.exists() {
        eprintln!("error: not found: {}", p.display());
        std::process::exit(2);
    }
    if as_json {
        let v = dsv_core::dump::dump_file_json(p, opts).unwrap_or_else(|e| fail(p, e));
        print_json(&v);
    } else {
        let s = dsv_core::dump::dump_file_text(p, opts).unwrap_or_else(|e| fail(p, e));
        print!("{}", s);
    }
}

fn cmd_scan(args: ScanArgs) {
    if !args.dir.is_dir() {
        eprintln!("error: not a directory: {}", args.dir.display());
        std::process::exit(2);
    }
    for p in find_store_files(&args.dir, args.depth) {
        println!("{}", p.display());
    }
}

fn print_json(v: &serde_json::Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(4);
        }
    }
}

fn fail(path: &Path, e: dsv_core::DsStoreError) -> ! {
    eprintln!("error: {}: {}", path.display(), e);
    std::process::exit(3);
}
