// JSON emission for rock/IO objects.
//
// The escaping is deliberately selective: `"`, `\`, CR, LF and TAB get
// their textual escapes, every other byte passes through verbatim. No
// general Unicode escaping.

/// Assembles one JSON object body, optionally under a named top-level
/// wrapper: `{"<name>":{ ...fields... }}`.
///
/// Fields are comma-joined; the caller marks the last field with
/// `end = true`, which suppresses that field's trailing comma.
pub struct JsonWriter {
    buf: Vec<u8>,
    wrapped: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        JsonWriter {
            buf: Vec::with_capacity(64),
            wrapped: false,
        }
    }

    /// Open a named wrapper object.
    pub fn begin(&mut self, name: &str) {
        self.buf.push(b'{');
        self.quoted(name);
        self.buf.extend_from_slice(b":{");
        self.wrapped = true;
    }

    /// Open a bare object body.
    pub fn begin_object(&mut self) {
        self.buf.push(b'{');
    }

    pub fn kv_string(&mut self, key: &str, value: &str, end: bool) {
        self.quoted(key);
        self.buf.push(b':');
        self.quoted(value);
        self.comma(end);
    }

    pub fn kv_int(&mut self, key: &str, value: i64, end: bool) {
        self.quoted(key);
        self.buf.push(b':');
        let mut itoa_buf = itoa::Buffer::new();
        self.buf.extend_from_slice(itoa_buf.format(value).as_bytes());
        self.comma(end);
    }

    /// Nested userdata reference field:
    /// `"key":{"type":"userdata","value":"<name>"}`.
    pub fn kv_userdata(&mut self, key: &str, name: &str, end: bool) {
        self.quoted(key);
        self.buf.extend_from_slice(b":{\"type\":\"userdata\",\"value\":");
        self.quoted(name);
        self.buf.push(b'}');
        self.comma(end);
    }

    /// Close the object (and the wrapper, if one was opened).
    pub fn end_object(&mut self) {
        self.buf.push(b'}');
        if self.wrapped {
            self.buf.push(b'}');
            self.wrapped = false;
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn comma(&mut self, end: bool) {
        if !end {
            self.buf.push(b',');
        }
    }

    fn quoted(&mut self, s: &str) {
        self.buf.push(b'"');
        escape_into(&mut self.buf, s);
        self.buf.push(b'"');
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape `"`, `\`, CR, LF and TAB; all other bytes verbatim.
pub fn escape_into(buf: &mut Vec<u8>, s: &str) {
    for &b in s.as_bytes() {
        match b {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            _ => buf.push(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str) -> String {
        let mut buf = Vec::new();
        escape_into(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escaped("a\"b"), "a\\\"b");
        assert_eq!(escaped("a\\b"), "a\\\\b");
        assert_eq!(escaped("line1\nline2\t\r"), "line1\\nline2\\t\\r");
        // no general unicode escaping
        assert_eq!(escaped("héllo"), "héllo");
    }

    #[test]
    fn test_comma_rules() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.kv_string("a", "1", false);
        w.kv_string("b", "2", true);
        w.end_object();
        assert_eq!(w.finish(), br#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn test_named_wrapper() {
        let mut w = JsonWriter::new();
        w.begin("sock");
        w.kv_string("host", "localhost", false);
        w.kv_int("port", 8080, true);
        w.end_object();
        assert_eq!(
            w.finish(),
            br#"{"sock":{"host":"localhost","port":8080}}"#
        );
    }

    #[test]
    fn test_userdata_field() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.kv_userdata("peer", "tcp-peer", true);
        w.end_object();
        assert_eq!(
            w.finish(),
            br#"{"peer":{"type":"userdata","value":"tcp-peer"}}"#
        );
    }

    #[test]
    fn test_output_is_valid_json() {
        let mut w = JsonWriter::new();
        w.begin("file");
        w.kv_string("path", "/tmp/a\"quoted\".log", false);
        w.kv_int("size", -42, false);
        w.kv_userdata("owner", "proc", true);
        w.end_object();
        let bytes = w.finish();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["file"]["path"], "/tmp/a\"quoted\".log");
        assert_eq!(parsed["file"]["size"], -42);
        assert_eq!(parsed["file"]["owner"]["type"], "userdata");
        assert_eq!(parsed["file"]["owner"]["value"], "proc");
    }
}
