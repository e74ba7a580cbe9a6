// Copyright 2024 TAKKT Industrial & Packaging GmbH
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

mod config;
mod consts;
mod part;
mod plan;
mod result;
mod s3;
mod source;
mod storage;
mod upload;

use crate::{
    config::{
        Credentials,
        Settings,
    },
    consts::{
        ACCESS_KEY_ID_ENV,
        BUCKET_ENV,
        DEFAULT_MAX_RETRIES,
        DEFAULT_REGION,
        DEFAULT_TIMEOUT,
        SECRET_ACCESS_KEY_ENV,
    },
    result::{
        Result,
        StdResultExt,
    },
    s3::S3Storage,
    source::Source,
    upload::Orchestrator,
};
use clap::{
    Args,
    Parser,
};
use std::{
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    error,
    info,
    warn,
};
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(version)]
enum Cli {
    /// Upload a file to S3 using a multipart upload.
    ///
    /// The file is read into memory and uploaded in parts, one after the other. Every part is
    /// attempted up to `--max-retries` times. If a part still can't be uploaded, the multipart
    /// upload is aborted so that S3 doesn't keep the parts that were already uploaded.
    ///
    /// Credentials and the bucket can be provided through the environment, or a `.env` file in
    /// the current working directory.
    Upload(Upload),
}

#[derive(Args)]
struct Upload {
    /// Path to the file to upload.
    #[arg(long)]
    file_to_upload: PathBuf,
    /// The S3 key where to upload the file to.
    ///
    /// Defaults to the name of the file.
    #[arg(long)]
    s3_key: Option<String>,
    /// The name of the S3 bucket to upload the file to.
    #[arg(long, env = BUCKET_ENV)]
    s3_bucket: Option<String>,
    /// The access key ID used to sign requests.
    #[arg(long, env = ACCESS_KEY_ID_ENV, hide_env_values = true)]
    access_key_id: Option<String>,
    /// The secret access key used to sign requests.
    #[arg(long, env = SECRET_ACCESS_KEY_ENV, hide_env_values = true)]
    secret_access_key: Option<String>,
    /// The AWS region of the bucket.
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,
    /// Content type of the object. Guessed from the file extension if not provided.
    #[arg(long)]
    content_type: Option<String>,
    /// Explicit part-size, in bytes, to use.
    ///
    /// The default is 5 MiB, or larger if the file would otherwise need more than 10,000 parts.
    #[arg(long)]
    override_part_size: Option<u64>,
    /// How often the upload of a single part is attempted before the upload is aborted.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    /// Time after which the upload is cancelled and aborted, e.g. `90m` or `2h`.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.into())]
    timeout: humantime::Duration,
    /// Print a JSON description of the uploaded object to stdout.
    #[arg(long)]
    json: bool,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_to_upload", &self.file_to_upload)
            .field("s3_key", &self.s3_key)
            .field("s3_bucket", &self.s3_bucket)
            .field("region", &self.region)
            .field("content_type", &self.content_type)
            .field("override_part_size", &self.override_part_size)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}

impl Upload {
    async fn run(self) -> Result<()> {
        debug!("Running upload command: {:?}", self);

        let credentials =
            Credentials::new(self.access_key_id, self.secret_access_key, self.s3_bucket)?;

        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();
        tokio::spawn(cancel_on_timeout_or_interrupt(
            cancel.clone(),
            self.timeout.into(),
        ));

        let source = Source::read(&self.file_to_upload).await?;
        let key = match self.s3_key {
            Some(key) => key,
            None => source.default_key()?,
        };
        let content_type = self
            .content_type
            .unwrap_or_else(|| source.content_type.clone());
        let settings = Settings::for_file(
            credentials.bucket.clone(),
            source.len(),
            self.override_part_size,
            self.max_retries,
        )?;

        let s3 = S3Storage::new(&credentials, self.region).await;
        let receipt = Orchestrator::new(s3, settings)
            .run(source.bytes, &key, &content_type, &cancel)
            .await?;

        info!(
            "Uploaded {} ({} bytes, {} parts) to {}",
            source.path.display(),
            receipt.size_in_bytes,
            receipt.parts.len(),
            receipt
                .location
                .clone()
                .unwrap_or_else(|| format!("s3://{}/{}", receipt.bucket, receipt.key)),
        );
        if self.json {
            let json = serde_json::to_string_pretty(&receipt).into_config()?;
            println!("{}", json);
        }

        Ok(())
    }
}

/// Cancels `cancel` once `timeout` has passed or the process is interrupted, whichever comes
/// first.
async fn cancel_on_timeout_or_interrupt(cancel: CancellationToken, timeout: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(timeout) => {
            warn!(
                "The upload did not finish within {}, cancelling it",
                humantime::format_duration(timeout),
            );
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Received interrupt, cancelling the upload");
        }
    }
    cancel.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_target(false),
        )
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => debug!("No .env file found, using the environment as is"),
        Err(err) => {
            error!("Failed to load .env file: {}", err);
            return ExitCode::FAILURE;
        }
    }

    let command = Cli::parse();
    let result = match command {
        Cli::Upload(cmd) => cmd.run().await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_upload() {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_timeout_or_interrupt(
            cancel.clone(),
            DEFAULT_TIMEOUT,
        ));
        tokio::task::yield_now().await;

        tokio::time::advance(DEFAULT_TIMEOUT / 2).await;
        assert!(!cancel.is_cancelled());

        tokio::time::advance(DEFAULT_TIMEOUT / 2 + Duration::from_secs(1)).await;
        watcher.await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_upload_stops_the_watcher() {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_timeout_or_interrupt(
            cancel.clone(),
            DEFAULT_TIMEOUT,
        ));
        tokio::task::yield_now().await;
        let started = tokio::time::Instant::now();

        drop(cancel.clone().drop_guard());

        watcher.await.unwrap();
        assert!(cancel.is_cancelled());
        assert!(started.elapsed() < DEFAULT_TIMEOUT);
    }
}
