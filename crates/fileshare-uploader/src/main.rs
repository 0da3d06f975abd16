//! Command-line upload client
//!
//! Usage: fileshare-uploader <api-url> <lifetime-seconds> [file]
//!
//! Reads the file (or stdin when no file is given) and uploads it to the
//! file share service. Designed to also work as an SSH forced command, in
//! which case the display name is taken from $SSH_ORIGINAL_COMMAND.

mod client;

use client::UploadClient;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

fn display_name(file: Option<&str>) -> String {
    if let Some(path) = file {
        if let Some(name) = Path::new(path).file_name() {
            return name.to_string_lossy().into_owned();
        }
    }
    match std::env::var("SSH_ORIGINAL_COMMAND") {
        Ok(cmd) if !cmd.is_empty() => cmd
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => chrono::Utc::now().timestamp().to_string(),
    }
}

async fn read_input(file: Option<&str>) -> std::io::Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path).await,
        None => {
            let mut data = Vec::new();
            tokio::io::stdin().read_to_end(&mut data).await?;
            Ok(data)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <api-url> <lifetime-seconds> [file]", args[0]);
        return ExitCode::FAILURE;
    }

    let lifetime_secs: u64 = match args[2].parse() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("invalid lifetime '{}': {}", args[2], e);
            return ExitCode::FAILURE;
        }
    };
    let file = args.get(3).map(String::as_str);

    let data = match read_input(file).await {
        Ok(data) => data,
        Err(e) => {
            eprintln!("failed to read input: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let name = display_name(file);

    let client = UploadClient::new(&args[1], lifetime_secs);
    match client.upload(data, &name).await {
        Ok(url) => {
            println!("Uploaded file available at {} for {} second(s)", url, lifetime_secs);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to upload file: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_from_file_path() {
        assert_eq!(display_name(Some("/tmp/reports/q3.pdf")), "q3.pdf");
        assert_eq!(display_name(Some("notes.txt")), "notes.txt");
    }

    #[test]
    fn test_display_name_fallback_is_numeric() {
        // Without a file argument or SSH_ORIGINAL_COMMAND the name is an
        // epoch timestamp
        if std::env::var("SSH_ORIGINAL_COMMAND").is_err() {
            let name = display_name(None);
            assert!(name.parse::<i64>().is_ok());
        }
    }
}
