//! Output capping.
//!
//! Job output can be arbitrarily large. Middle-omission keeps both the start
//! of the output (what the command was doing) and the end (the final result
//! or error), which is what a reader of a run record usually wants.

/// Truncate `output` to roughly `max_bytes` using middle-omission.
///
/// If `output` fits, it is returned unchanged. Otherwise the result is the
/// first `max_bytes/2` bytes, a marker line, and the last `max_bytes/2`
/// bytes. Job output is not guaranteed to be UTF-8, so the split is done on
/// raw bytes.
pub fn truncate_output(mut output: Vec<u8>, max_bytes: usize) -> Vec<u8> {
    if output.len() <= max_bytes {
        return output;
    }

    let total = output.len();
    let half = max_bytes / 2;
    let omitted = total - 2 * half;

    let tail = output.split_off(total - half);
    output.truncate(half);
    let marker = format!("\n\n... [OUTPUT TRUNCATED: {omitted} bytes omitted] ...\n\n");
    output.extend_from_slice(marker.as_bytes());
    output.extend_from_slice(&tail);
    output
}
