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

use crate::{
    config::Settings,
    consts::MINIMUM_PART_NUMBER,
    part::{
        upload_part,
        PartError,
    },
    plan::plan,
    result::{
        AnyhowResultExt,
        Error,
        PartFailure,
        Result,
    },
    storage::{
        CompletedManifest,
        StorageClient,
        UploadTransaction,
    },
};
use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    error,
    info,
};

/// The outcome of a successful upload.
#[derive(Debug, Serialize)]
pub(crate) struct UploadReceipt {
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) upload_id: String,
    pub(crate) content_type: String,
    pub(crate) size_in_bytes: u64,
    pub(crate) location: Option<String>,
    pub(crate) e_tag: Option<String>,
    pub(crate) parts: CompletedManifest,
}

/// Drives a multipart upload from creation to completion.
///
/// Parts are uploaded one after the other. The first part that can't be uploaded stops the
/// upload, and the multipart upload is aborted so that no orphaned parts are left behind.
pub(crate) struct Orchestrator<C> {
    client: C,
    settings: Settings,
}

impl<C: StorageClient> Orchestrator<C> {
    pub(crate) fn new(client: C, settings: Settings) -> Self {
        Self { client, settings }
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Uploads `body` to `key` in the configured bucket.
    ///
    /// Cancelling `cancel` while parts are being uploaded, or after the last part was accepted,
    /// fails the run and aborts the multipart upload. Creating and completing the multipart upload
    /// are never interrupted: a completion request that hangs is not bound by `cancel`, and a
    /// failed completion is returned as [`Error::Finalize`] without aborting, since the object
    /// may already have been assembled.
    #[tracing::instrument(skip_all, fields(key = %key))]
    pub(crate) async fn run(
        &self,
        body: Bytes,
        key: &str,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt> {
        let size_in_bytes = body.len() as u64;
        if size_in_bytes == 0 {
            return Err(anyhow::anyhow!(
                "The file is empty, but a multipart upload requires at least one part"
            ))
            .into_source();
        }

        let parts = plan(size_in_bytes, self.settings.part_size);
        debug!(
            "File size: {} bytes. Part size: {} bytes. Number of parts to upload: {}.",
            size_in_bytes,
            self.settings.part_size,
            parts.len(),
        );

        if cancel.is_cancelled() {
            return Err(anyhow::anyhow!(
                "The upload was cancelled before the multipart upload was created"
            ))
            .into_open_transaction();
        }
        let transaction = self
            .client
            .open_transaction(&self.settings.bucket, key, content_type)
            .await
            .into_open_transaction()?;
        info!(
            "Starting upload {} with size {} bytes to: s3://{}/{}",
            transaction.upload_id, size_in_bytes, transaction.bucket, transaction.key,
        );

        let mut manifest = CompletedManifest::with_capacity(parts.len());
        for part in &parts {
            match upload_part(
                &self.client,
                &transaction,
                part,
                body.slice(part.range()),
                self.settings.max_retries,
                cancel,
            )
            .await
            {
                Ok(completed_part) => manifest.push(completed_part),
                Err(err) => return Err(self.abort(transaction, err).await),
            }
        }

        if cancel.is_cancelled() {
            let err = PartError {
                part_number: parts.last().map_or(MINIMUM_PART_NUMBER, |part| part.number),
                attempts: 0,
                cause: anyhow::anyhow!(
                    "The upload was cancelled or timed out before it could be completed"
                ),
            };
            return Err(self.abort(transaction, err).await);
        }

        self.finalize(transaction, manifest, size_in_bytes).await
    }

    async fn abort(&self, transaction: UploadTransaction, err: PartError) -> Error {
        error!(
            "Failed to upload part {} after {} attempt(s), aborting multipart upload {}: {:#}",
            err.part_number, err.attempts, transaction.upload_id, err.cause,
        );

        let abort_error = match self.client.abort_transaction(&transaction).await {
            Ok(()) => {
                info!("Aborted multipart upload {}", transaction.upload_id);
                None
            }
            Err(abort_error) => {
                error!(
                    "Failed to abort multipart upload {}, its parts may still be stored: {:#}",
                    transaction.upload_id, abort_error,
                );
                Some(abort_error)
            }
        };

        Error::PartFailed(PartFailure {
            upload_id: transaction.upload_id,
            part_number: err.part_number,
            attempts: err.attempts,
            cause: err.cause,
            abort_error,
        })
    }

    async fn finalize(
        &self,
        transaction: UploadTransaction,
        manifest: CompletedManifest,
        size_in_bytes: u64,
    ) -> Result<UploadReceipt> {
        debug!(
            "Completing multipart upload {} with {} parts",
            transaction.upload_id,
            manifest.len(),
        );

        match self
            .client
            .finalize_transaction(&transaction, &manifest)
            .await
        {
            Ok(finalized) => {
                info!(
                    "Successfully uploaded the file. ETag: {}",
                    finalized.e_tag.as_deref().unwrap_or("<unknown>"),
                );
                Ok(UploadReceipt {
                    bucket: transaction.bucket,
                    key: transaction.key,
                    upload_id: transaction.upload_id,
                    content_type: transaction.content_type,
                    size_in_bytes,
                    location: finalized.location,
                    e_tag: finalized.e_tag,
                    parts: manifest,
                })
            }
            Err(err) => {
                error!(
                    "Completing multipart upload {} failed. The upload was not aborted, check whether s3://{}/{} exists and abort the upload manually if it doesn't.",
                    transaction.upload_id, transaction.bucket, transaction.key,
                );
                Err(Error::Finalize {
                    upload_id: transaction.upload_id,
                    source: err,
                })
            }
        }
    }
}
