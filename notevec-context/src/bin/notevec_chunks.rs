use clap::Parser;
use notevec_context::{chunk_markdown, extract_title};
use std::fs;
use std::io::{self, Read};

/// Chunk a Markdown note and print the result as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input note. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Also print the extracted title on stderr.
    #[arg(short, long)]
    title: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let (content, name) = if let Some(input_path) = &args.input {
        (fs::read_to_string(input_path)?, input_path.clone())
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        (buffer, "stdin".to_string())
    };

    if args.title {
        eprintln!("title: {}", extract_title(&content, &name));
    }

    let chunks = chunk_markdown(&content);
    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{json_output}");

    Ok(())
}
