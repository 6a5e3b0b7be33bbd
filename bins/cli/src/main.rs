//! gcsfile command-line tool
//!
//! Runs each file-service operation against the configured bucket. Useful for
//! checking credentials and bucket permissions outside the host application.

use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::{AsyncWriteExt as _, TryStreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt as _;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gcsfile_core::storage::{
    DeleteRequest, FileService, GcsFileService, GetFileRequest, StorageConfig, UploadFile,
    UploadStream, UploadStreamRequest, presigned_expiry,
};
use gcsfile_shared::GcpConfig;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Google Cloud Storage file service.
///
/// Configuration comes from `GCP_*` environment variables (a `.env` file is
/// honoured): GCP_BUCKET_NAME, GCP_DIRECTORY, GCP_PROJECT_ID,
/// GCP_CLIENT_EMAIL and GCP_PRIVATE_KEY.
#[derive(Debug, Parser)]
#[command(name = "gcsfile", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file under a timestamped key and print `{key, url}`.
    Upload {
        /// Local file to upload.
        path: PathBuf,
        /// File name used in the key (defaults to the local file name).
        #[arg(long)]
        name: Option<String>,
        /// MIME type stored with the object.
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
        /// Use the protected upload operation.
        #[arg(long)]
        protected: bool,
    },
    /// Delete an object.
    Delete {
        /// Object key.
        key: String,
    },
    /// Stream a file (or stdin) into an object named verbatim.
    Put {
        /// Object name under the directory prefix.
        name: String,
        /// MIME type stored with the object.
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
        /// Read from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Stream an object to a file (or stdout).
    Get {
        /// Object key.
        key: String,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a signed download URL valid for 15 minutes.
    Presign {
        /// Object key.
        key: String,
    },
}

#[derive(Debug, Serialize)]
struct PresignOutput {
    url: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
struct StreamOutput {
    key: String,
    url: String,
    bytes: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gcsfile=info,gcsfile_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = GcpConfig::load().context("failed to load GCP configuration")?;
    let service = GcsFileService::from_config(StorageConfig::from(&config))?;

    run(&service, cli.command).await
}

async fn run(service: &dyn FileService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Upload {
            path,
            name,
            content_type,
            protected,
        } => {
            let original_name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("cannot derive a file name from the path, pass --name")?,
            };
            let file = UploadFile {
                path,
                original_name,
                mime_type: content_type,
            };

            let result = if protected {
                service.upload_protected(&file).await?
            } else {
                service.upload(&file).await?
            };
            print_json(&result)
        }
        Command::Delete { key } => {
            service.delete(&DeleteRequest { file_key: key }).await?;
            Ok(())
        }
        Command::Put {
            name,
            content_type,
            input,
        } => {
            let UploadStream {
                mut writer,
                key,
                url,
            } = service
                .get_upload_stream_descriptor(&UploadStreamRequest {
                    name,
                    ext: content_type,
                })
                .await?;

            let bytes = match input {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    futures::io::copy(file.compat(), &mut writer).await?
                }
                None => futures::io::copy(tokio::io::stdin().compat(), &mut writer).await?,
            };
            writer.close().await.context("upload did not complete")?;

            print_json(&StreamOutput { key, url, bytes })
        }
        Command::Get { key, output } => {
            let mut stream = service
                .get_download_stream(&GetFileRequest {
                    file_key: key.clone(),
                })
                .await?;

            let mut sink: Pin<Box<dyn tokio::io::AsyncWrite + Send>> = match &output {
                Some(path) => Box::pin(
                    tokio::fs::File::create(path)
                        .await
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::pin(tokio::io::stdout()),
            };

            let mut total = 0usize;
            while let Some(chunk) = stream.try_next().await? {
                sink.write_all(&chunk).await?;
                total += chunk.len();
            }
            sink.flush().await?;

            info!(key = %key, bytes = total, "Download complete");
            Ok(())
        }
        Command::Presign { key } => {
            let url = service
                .get_presigned_download_url(&GetFileRequest { file_key: key })
                .await?;
            let expires_at = presigned_expiry(&url);
            print_json(&PresignOutput { url, expires_at })
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "gcsfile",
            "upload",
            "/tmp/photo.png",
            "--content-type",
            "image/png",
            "--protected",
        ])
        .expect("should parse");

        match cli.command {
            Command::Upload {
                path,
                name,
                content_type,
                protected,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/photo.png"));
                assert_eq!(name, None);
                assert_eq!(content_type, "image/png");
                assert!(protected);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_put_defaults() {
        let cli = Cli::try_parse_from(["gcsfile", "put", "export.csv"]).expect("should parse");

        match cli.command {
            Command::Put {
                name,
                content_type,
                input,
            } => {
                assert_eq!(name, "export.csv");
                assert_eq!(content_type, DEFAULT_CONTENT_TYPE);
                assert_eq!(input, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_key_argument_required() {
        assert!(Cli::try_parse_from(["gcsfile", "presign"]).is_err());
        assert!(Cli::try_parse_from(["gcsfile", "delete"]).is_err());
    }
}
