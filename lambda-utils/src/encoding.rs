use serde::Serialize;
use serde_json::ser::Formatter;

use std::io;

/// JSON formatter that separates object members and array elements with `", "` and keys from
/// values with `": "` (e.g., `{"a": [1, 2]}`).
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
  fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
  where
    W: ?Sized + io::Write,
  {
    if first {
      Ok(())
    } else {
      writer.write_all(b", ")
    }
  }

  fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
  where
    W: ?Sized + io::Write,
  {
    if first {
      Ok(())
    } else {
      writer.write_all(b", ")
    }
  }

  fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
  where
    W: ?Sized + io::Write,
  {
    writer.write_all(b": ")
  }
}

/// Serialize `value` to a single-line JSON string, as used for every response body.
pub(crate) fn to_json<T>(value: &T) -> Result<String, serde_path_to_error::Error<serde_json::Error>>
where
  T: Serialize,
{
  let mut json_bytes = Vec::new();
  let mut serializer = serde_json::Serializer::with_formatter(&mut json_bytes, SpacedFormatter);
  serde_path_to_error::serialize(value, &mut serializer)?;
  Ok(String::from_utf8(json_bytes).expect("JSON must be UTF-8"))
}
