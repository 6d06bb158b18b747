//! kvlog CLI Client
//!
//! Sends a single command to a kvlog server and prints the result.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kvlog::protocol::{read_response, write_command, Command, Status};

/// kvlog CLI
#[derive(Parser, Debug)]
#[command(name = "kvlog-cli")]
#[command(about = "CLI for the kvlog key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
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
    Set {
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

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Get { key } => Command::Get { key },
        Commands::Set { key, value } => Command::Put { key, value },
        Commands::Del { key } => Command::Delete { key },
        Commands::Ping => Command::Ping,
    };

    match send(&args.server, &command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn send(server: &str, command: &Command) -> kvlog::Result<ExitCode> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    let response = read_response(&mut reader)?;

    match response.status {
        Status::Ok => {
            println!("{}", response.payload.as_deref().unwrap_or("OK"));
            Ok(ExitCode::SUCCESS)
        }
        Status::NotFound => {
            println!("(not found)");
            Ok(ExitCode::from(2))
        }
        Status::Error => {
            eprintln!("server error: {}", response.payload.unwrap_or_default());
            Ok(ExitCode::FAILURE)
        }
    }
}
