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
    config::Credentials,
    storage::{
        CompletedManifest,
        FinalizedObject,
        StorageClient,
        UploadTransaction,
    },
};
use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::Region,
    primitives::ByteStream,
    types::{
        CompletedMultipartUpload,
        CompletedPart,
    },
};
use bytes::Bytes;
use tracing::debug;

/// [`StorageClient`] backed by Amazon S3.
pub(crate) struct S3Storage {
    s3: aws_sdk_s3::Client,
}

impl S3Storage {
    pub(crate) async fn new(credentials: &Credentials, region: String) -> Self {
        debug!("Creating S3 client for region {}", region);
        let config = aws_config::defaults(BehaviorVersion::v2024_03_28())
            .region(Region::new(region))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "ferry",
            ))
            .load()
            .await;
        Self {
            s3: aws_sdk_s3::Client::new(&config),
        }
    }
}

impl StorageClient for S3Storage {
    async fn open_transaction(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> anyhow::Result<UploadTransaction> {
        let multipart_upload = self
            .s3
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("CreateMultipartUpload failed for s3://{}/{}", bucket, key))?;
        let upload_id = multipart_upload.upload_id.context(
            "Creating multipart upload probably failed, because no upload ID was returned",
        )?;

        Ok(UploadTransaction {
            upload_id,
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            content_type: content_type.to_owned(),
        })
    }

    async fn upload_part(
        &self,
        transaction: &UploadTransaction,
        part_number: i32,
        body: Bytes,
    ) -> anyhow::Result<String> {
        let content_length = body.len() as i64;
        let uploaded_part = self
            .s3
            .upload_part()
            .bucket(&transaction.bucket)
            .key(&transaction.key)
            .upload_id(&transaction.upload_id)
            .part_number(part_number)
            .content_length(content_length)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("UploadPart failed for part {}", part_number))?;

        uploaded_part
            .e_tag
            .with_context(|| format!("No ETag was returned for part {}", part_number))
    }

    async fn abort_transaction(&self, transaction: &UploadTransaction) -> anyhow::Result<()> {
        self.s3
            .abort_multipart_upload()
            .bucket(&transaction.bucket)
            .key(&transaction.key)
            .upload_id(&transaction.upload_id)
            .send()
            .await
            .with_context(|| {
                format!(
                    "AbortMultipartUpload failed for upload {}",
                    transaction.upload_id
                )
            })?;
        Ok(())
    }

    async fn finalize_transaction(
        &self,
        transaction: &UploadTransaction,
        manifest: &CompletedManifest,
    ) -> anyhow::Result<FinalizedObject> {
        let parts = manifest
            .parts()
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .e_tag(&part.e_tag)
                    .part_number(part.part_number)
                    .build()
            })
            .collect();

        let completed_multipart_upload = self
            .s3
            .complete_multipart_upload()
            .bucket(&transaction.bucket)
            .key(&transaction.key)
            .upload_id(&transaction.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .with_context(|| {
                format!(
                    "CompleteMultipartUpload failed for upload {}",
                    transaction.upload_id
                )
            })?;

        Ok(FinalizedObject {
            location: completed_multipart_upload.location,
            e_tag: completed_multipart_upload.e_tag,
        })
    }
}
