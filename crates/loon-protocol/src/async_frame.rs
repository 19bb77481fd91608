//! The frame codec over tokio streams.
//!
//! Same semantics as the blocking functions in `frame`: byte-at-a-time
//! reads that stop right after the newline, one `write_all` per frame.

use std::io;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::frame::{encode_frame, FrameDecoder};

pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Value>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut decoder = FrameDecoder::new();
    let mut byte = [0u8; 1];

    loop {
        if reader.read(&mut byte).await? == 0 {
            return Ok(None);
        }
        if let Some(value) = decoder.push_byte(byte[0]) {
            return Ok(Some(value));
        }
    }
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Serialize + ?Sized,
{
    let buf = encode_frame(value)?;
    writer.write_all(&buf).await?;
    writer.flush().await
}
