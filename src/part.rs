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
    plan::Part,
    storage::{
        CompletedPart,
        StorageClient,
        UploadTransaction,
    },
};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
    warn,
};

/// Why a part could not be uploaded.
#[derive(Debug)]
pub(crate) struct PartError {
    pub(crate) part_number: i32,
    pub(crate) attempts: u32,
    pub(crate) cause: anyhow::Error,
}

/// Uploads a single part, making at most `max_retries` attempts.
///
/// Failed attempts are retried right away with the same body. Once all attempts are used up, the
/// error of the last attempt is returned. Cancelling `cancel` fails the part immediately, even
/// while an attempt is in flight.
#[tracing::instrument(skip_all, fields(part = part.number))]
pub(crate) async fn upload_part<C: StorageClient>(
    client: &C,
    transaction: &UploadTransaction,
    part: &Part,
    body: Bytes,
    max_retries: u32,
    cancel: &CancellationToken,
) -> Result<CompletedPart, PartError> {
    debug_assert_eq!(body.len() as u64, part.size);

    let mut attempts = 0;
    let mut last_error = None;
    while attempts < max_retries {
        if cancel.is_cancelled() {
            break;
        }
        attempts += 1;
        debug!(
            "Uploading part {} ({} bytes), attempt {} of {}",
            part.number, part.size, attempts, max_retries,
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = client.upload_part(transaction, part.number, body.clone()) => result,
        };
        match result {
            Ok(e_tag) => {
                info!("Uploaded part #{} ({} bytes)", part.number, part.size);
                return Ok(CompletedPart {
                    part_number: part.number,
                    e_tag,
                });
            }
            Err(err) if attempts < max_retries => {
                warn!(
                    "Failed to upload part #{}, retrying (attempt {} of {}): {:#}",
                    part.number, attempts, max_retries, err,
                );
                last_error = Some(err);
            }
            Err(err) => last_error = Some(err),
        }
    }

    let cause = if cancel.is_cancelled() {
        anyhow::anyhow!("The upload was cancelled or timed out")
    } else {
        last_error.unwrap_or_else(|| anyhow::anyhow!("No attempt was made to upload the part"))
    };
    Err(PartError {
        part_number: part.number,
        attempts,
        cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::{
        e_tag_for,
        MockStorage,
        UPLOAD_ID,
    };

    fn transaction() -> UploadTransaction {
        UploadTransaction {
            upload_id: UPLOAD_ID.to_owned(),
            bucket: "bucket".to_owned(),
            key: "key".to_owned(),
            content_type: "application/octet-stream".to_owned(),
        }
    }

    fn part() -> (Part, Bytes) {
        let body = Bytes::from_static(b"hello world");
        let part = Part {
            number: 2,
            offset: 5,
            size: body.len() as u64,
        };
        (part, body)
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let storage = MockStorage::new();
        let (part, body) = part();

        let completed = upload_part(
            &storage,
            &transaction(),
            &part,
            body,
            3,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            completed,
            CompletedPart {
                part_number: 2,
                e_tag: e_tag_for(2),
            }
        );
        assert_eq!(storage.attempts(2), 1);
    }

    #[tokio::test]
    async fn stops_retrying_once_an_attempt_succeeds() {
        let storage = MockStorage::new().failing_part(2, 2);
        let (part, body) = part();

        let completed = upload_part(
            &storage,
            &transaction(),
            &part,
            body,
            3,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(completed.e_tag, e_tag_for(2));
        assert_eq!(storage.attempts(2), 3);
    }

    #[tokio::test]
    async fn retries_with_the_same_body() {
        let storage = MockStorage::new().failing_part(2, 1);
        let (part, body) = part();

        upload_part(
            &storage,
            &transaction(),
            &part,
            body.clone(),
            3,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let bodies: Vec<Bytes> = storage
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                crate::storage::mock::Call::UploadPart { body, .. } => Some(body),
                _ => None,
            })
            .collect();
        assert_eq!(bodies, vec![body.clone(), body]);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let storage = MockStorage::new().failing_part(2, u32::MAX);
        let (part, body) = part();

        let err = upload_part(
            &storage,
            &transaction(),
            &part,
            body,
            3,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(storage.attempts(2), 3);
        assert_eq!(err.part_number, 2);
        assert_eq!(err.attempts, 3);
        assert!(
            err.cause.to_string().contains("attempt 3"),
            "expected the error of the last attempt, got: {}",
            err.cause,
        );
    }

    #[tokio::test]
    async fn honours_a_custom_retry_count() {
        let storage = MockStorage::new().failing_part(2, u32::MAX);
        let (part, body) = part();

        let err = upload_part(
            &storage,
            &transaction(),
            &part,
            body,
            5,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(storage.attempts(2), 5);
        assert_eq!(err.attempts, 5);
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_attempt() {
        let storage = MockStorage::new();
        let (part, body) = part();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = upload_part(&storage, &transaction(), &part, body, 3, &cancel)
            .await
            .unwrap_err();

        assert_eq!(storage.attempts(2), 0);
        assert_eq!(err.attempts, 0);
        assert!(err.cause.to_string().contains("cancelled"));
    }
}
