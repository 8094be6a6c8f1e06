use std::env;

fn print_usage() {
    eprintln!("Usage: zencache <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install             Fetch the asset manifest into the cache bucket");
    eprintln!("  serve               Serve requests cache-first with network fallback");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>     TOML configuration file");
    eprintln!("  --cache-dir <PATH>  Bucket root directory");
    eprintln!("  --bucket <NAME>     Cache bucket name (the version tag)");
    eprintln!("  --origin <URL>      Origin that relative manifest entries resolve against");
    eprintln!("  --sweep             After a successful install, delete all other buckets");
    eprintln!("  --port <PORT>       Bind port for serve mode");
    eprintln!("  -h, --help          Show this help");
}

#[tokio::main]
async fn main() -> zencache::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        std::process::exit(if args.is_empty() { 1 } else { 0 });
    }

    #[cfg(feature = "cli")]
    {
        zencache::cli::run(args).await
    }
    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
