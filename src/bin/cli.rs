//! logkv CLI Client
//!
//! Command-line interface for interacting with a logkv server, plus
//! offline log verification.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use logkv::log::LogRecovery;
use logkv::protocol::{decode_pairs, read_response, write_command, Command, Response, Status};

/// logkv CLI
#[derive(Parser, Debug)]
#[command(name = "logkv-cli")]
#[command(about = "CLI for the logkv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Set several pairs at once: key=value ...
    Batch {
        /// Pairs in key=value form
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// List live pairs with start <= key <= end
    Range {
        start: String,
        end: String,
    },

    /// Ping the server
    Ping,

    /// Check a log file's integrity without a server
    Verify {
        /// Log file path
        #[arg(short, long, default_value = "data/data.db")]
        path: PathBuf,
    },

    /// Cut a log back to its last readable record (server must be stopped)
    Repair {
        /// Log file path
        #[arg(short, long, default_value = "data/data.db")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Verify { path } => return verify(&path),
        Commands::Repair { path } => return repair(&path),
        Commands::Get { key } => Command::Get { key },
        Commands::Put { key, value } => Command::Put { key, value },
        Commands::Del { key } => Command::Delete { key },
        Commands::Batch { pairs } => {
            let mut keys = Vec::with_capacity(pairs.len());
            let mut values = Vec::with_capacity(pairs.len());
            for pair in pairs {
                match pair.split_once('=') {
                    Some((key, value)) => {
                        keys.push(key.to_string());
                        values.push(value.to_string());
                    }
                    None => {
                        eprintln!("(error) expected key=value, got {:?}", pair);
                        return ExitCode::FAILURE;
                    }
                }
            }
            Command::BatchPut { keys, values }
        }
        Commands::Range { start, end } => Command::Range { start, end },
        Commands::Ping => Command::Ping,
    };

    let is_range = matches!(command, Command::Range { .. });

    let response = match send(&args.server, &command) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("(error) {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    match response.status {
        Status::Ok if is_range => {
            let pairs = match response.payload.as_deref().map(decode_pairs).transpose() {
                Ok(pairs) => pairs.unwrap_or_default(),
                Err(e) => {
                    eprintln!("(error) {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if pairs.is_empty() {
                println!("(empty)");
            }
            for (key, value) in pairs {
                println!("{} = {}", key, value);
            }
            ExitCode::SUCCESS
        }
        Status::Ok => {
            match response.payload {
                Some(_) => println!("{}", response.text()),
                None => println!("OK"),
            }
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(nil)");
            ExitCode::FAILURE
        }
        Status::BadRequest | Status::Error => {
            eprintln!("(error) {}", response.text());
            ExitCode::FAILURE
        }
    }
}

/// Send one command and wait for its response
fn send(addr: &str, command: &Command) -> logkv::Result<Response> {
    let stream = TcpStream::connect(addr)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn verify(path: &std::path::Path) -> ExitCode {
    match LogRecovery::verify(path) {
        Ok(result) => {
            println!("records:    {}", result.records_recovered);
            println!("tombstones: {}", result.tombstones);
            println!("valid len:  {} bytes", result.valid_len);
            if result.torn_tail {
                println!("torn tail:  yes (trimmed on next open)");
            }
            if let Some(offset) = result.corrupted_at {
                println!("corrupt:    first bad record at offset {}", offset);
                println!("            (store opens read-only until `repair` is run)");
            }
            if result.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("(error) {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn repair(path: &std::path::Path) -> ExitCode {
    match LogRecovery::repair(path) {
        Ok((recovery, removed)) => {
            println!("records kept:  {}", recovery.records_recovered);
            println!("bytes removed: {}", removed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("(error) {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
