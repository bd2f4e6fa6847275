use std::io::{self, Write};
use serde_json::Value;

use super::config::{OutputConfig, OutputFormat};
use super::types::Envelope;

pub trait Presenter: Send + Sync {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()>;
}

pub struct JsonPresenter { pub pretty: bool }
impl Presenter for JsonPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        if self.pretty { serde_json::to_writer_pretty(&mut *w, env).map_err(to_io)? } else { serde_json::to_writer(&mut *w, env).map_err(to_io)? }
        writeln!(w)
    }
}

/// Human summary: header line, then scalar fields (or the whole body when pretty).
pub struct TextPresenter { pub pretty: bool }
impl Presenter for TextPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}: {} ({})", env.kind(), env.op, env.meta.source)?;
        let body = env.payload();
        if self.pretty {
            serde_json::to_writer_pretty(&mut *w, body).map_err(to_io)?;
            return writeln!(w);
        }
        if let Value::Object(map) = body {
            for (k, v) in map {
                match v {
                    Value::Array(items) if items.iter().all(is_scalar) => {
                        let joined: Vec<String> = items.iter().map(scalar_text).collect();
                        writeln!(w, "  {}: [{}]", k, joined.join(", "))?;
                    }
                    v if is_scalar(v) => writeln!(w, "  {}: {}", k, scalar_text(v))?,
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

pub struct Emitter {
    presenter: Box<dyn Presenter>,
}

impl Emitter {
    pub fn from_config(cfg: OutputConfig) -> Self {
        let presenter: Box<dyn Presenter> = match cfg.format {
            OutputFormat::Json => Box::new(JsonPresenter { pretty: cfg.pretty }),
            OutputFormat::Text => Box::new(TextPresenter { pretty: cfg.pretty }),
        };
        Emitter { presenter }
    }

    pub fn emit(&self, env: &Envelope) -> io::Result<()> {
        let mut out = io::stdout();
        self.presenter.emit(env, &mut out)?;
        out.flush()
    }
}

fn is_scalar(v: &Value) -> bool { !matches!(v, Value::Array(_) | Value::Object(_)) }

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_io(e: serde_json::Error) -> io::Error { io::Error::new(io::ErrorKind::Other, e) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::types::Meta;
    use serde_json::json;

    fn render(p: &dyn Presenter, env: &Envelope) -> String {
        let mut buf: Vec<u8> = Vec::new();
        p.emit(env, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_presenter_lists_scalar_fields() {
        let result = json!({"collected": 45, "failed_pages": [7, 9], "output": "public/courses.json", "pages": [{"page": 1}]});
        let env = Envelope::result("fetch", &result, Meta::from_source("https://catalog.example.org/products")).unwrap();
        let s = render(&TextPresenter { pretty: false }, &env);
        assert!(s.starts_with("Result: fetch (https://catalog.example.org/products)\n"));
        assert!(s.contains("  collected: 45\n"));
        assert!(s.contains("  failed_pages: [7, 9]\n"));
        assert!(s.contains("  output: public/courses.json\n"));
        assert!(!s.contains("pages: [{"));
    }

    #[test]
    fn json_presenter_writes_one_line() {
        let env = Envelope::plan("fetch", &json!({"total_pages": 3}), Meta::from_source("x")).unwrap();
        let s = render(&JsonPresenter { pretty: false }, &env);
        assert_eq!(s.lines().count(), 1);
        let v: Value = serde_json::from_str(s.trim()).unwrap();
        assert_eq!(v["plan"]["total_pages"], 3);
        assert_eq!(v["apply"], false);
    }
}
