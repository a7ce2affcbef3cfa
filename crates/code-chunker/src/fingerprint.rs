use crate::language::Language;
use sha2::{Digest, Sha256};

/// 64-bit content fingerprint of a chunk.
///
/// Lines are trimmed; blank and comment lines are dropped, so chunks that
/// differ only in indentation or comments share a fingerprint.
pub fn fingerprint(content: &[u8], language: Language) -> u64 {
    let text = String::from_utf8_lossy(content);
    let mut hasher = Sha256::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || language.is_comment_line(line) || line.ends_with("*/") {
            continue;
        }
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
