// Segment decryption: adapts the synchronous AES-128-CBC cipher into a single
// awaited result for the async pipeline.

use aes::Aes128;
use async_trait::async_trait;
use bytes::Bytes;
use cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::MirrorError;
use crate::resource::SegmentKey;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[async_trait]
pub trait Decrypt: Send + Sync {
    /// Turns ciphertext into plaintext. Failures are final for the resource.
    async fn decrypt(&self, data: Bytes, key: &SegmentKey) -> Result<Bytes, MirrorError>;
}

/// AES-128-CBC with PKCS#7 padding, the HLS `METHOD=AES-128` scheme.
pub struct AesDecryptor {
    offload: bool,
}

impl AesDecryptor {
    /// Create a new decryptor. With `offload` the cipher runs on the
    /// blocking thread pool so large segments never stall other operations.
    pub fn new(offload: bool) -> Self {
        Self { offload }
    }

    pub fn is_offloaded(&self) -> bool {
        self.offload
    }

    /// Synchronous decryption of a whole segment.
    pub fn decrypt_sync(
        data: &[u8],
        key: &[u8; 16],
        iv: &[u8; 16],
    ) -> Result<Bytes, MirrorError> {
        let mut buffer = data.to_vec();

        let cipher = Aes128CbcDec::new_from_slices(key, iv).map_err(|e| {
            MirrorError::decryption(format!("Failed to initialize AES decryptor: {e}"))
        })?;

        let decrypted_len = cipher
            .decrypt_padded_mut::<Pkcs7>(&mut buffer)
            .map_err(|e| MirrorError::decryption(format!("Decryption failed: {e}")))?
            .len();

        buffer.truncate(decrypted_len);
        Ok(Bytes::from(buffer))
    }
}

impl Default for AesDecryptor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Decrypt for AesDecryptor {
    async fn decrypt(&self, data: Bytes, key: &SegmentKey) -> Result<Bytes, MirrorError> {
        if !self.offload {
            return Self::decrypt_sync(&data, &key.bytes, &key.iv);
        }

        let key = *key;
        tokio::task::spawn_blocking(move || Self::decrypt_sync(&data, &key.bytes, &key.iv))
            .await
            .map_err(|e| MirrorError::decryption(format!("Decryption offload task failed: {e}")))?
    }
}
