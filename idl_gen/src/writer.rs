/* Indentation-aware source writer shared by the codec and test generators */

const INDENT: &str = "    ";

/// Accumulates generated source text. Lines are emitted at the current
/// indentation level; blocks open with `... {`, indent their body, and close
/// with a configurable delimiter.
pub struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    /// Emit one line at the current indentation.
    pub fn emit(&mut self, line: &str) {
        if line.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit `header {`, run `body` one level deeper, then emit `}`.
    pub fn block(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.block_with(header, ("{", "}"), body);
    }

    /// Like [`block`](Self::block) but with explicit open/close delimiters,
    /// e.g. `("{", "};")` for a block expression ending a statement, or
    /// `(None, "}")` style openers where the header carries its own brace.
    pub fn block_with(
        &mut self,
        header: &str,
        delim: (&str, &str),
        body: impl FnOnce(&mut Self),
    ) {
        if header.is_empty() {
            self.emit(delim.0);
        } else if delim.0.is_empty() {
            self.emit(header);
        } else {
            self.emit(&format!("{} {}", header, delim.0));
        }
        self.indent += 1;
        body(self);
        self.indent -= 1;
        self.emit(delim.1);
    }

    /// Run `body` one level deeper without delimiters.
    pub fn indented(&mut self, body: impl FnOnce(&mut Self)) {
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    /// Emit a list one element per line, e.g.
    /// `const FIELDS: &[&str] = &[` ... `];`.
    pub fn emit_list<S: AsRef<str>>(
        &mut self,
        before: &str,
        items: impl IntoIterator<Item = S>,
        delim: (&str, &str),
        after: &str,
    ) {
        self.emit(&format!("{}{}", before, delim.0));
        self.indent += 1;
        for item in items {
            self.emit(&format!("{},", item.as_ref()));
        }
        self.indent -= 1;
        self.emit(&format!("{}{}", delim.1, after));
    }

    /// Emit text wrapped to `width` columns, each line prefixed (used for
    /// doc comments). Words longer than the width get a line of their own.
    pub fn emit_wrapped(&mut self, text: &str, prefix: &str, width: usize) {
        let budget = width.saturating_sub(prefix.len() + INDENT.len() * self.indent);
        let mut line = String::new();
        for word in text.split_whitespace() {
            if !line.is_empty() && line.len() + 1 + word.len() > budget {
                self.emit(&format!("{}{}", prefix, line));
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            self.emit(&format!("{}{}", prefix, line));
        } else if text.is_empty() {
            self.emit(prefix.trim_end());
        }
    }

    /// Emit a function definition header + body. Short signatures stay on
    /// one line; long ones get one argument per line.
    pub fn emit_fn(
        &mut self,
        access: &str,
        signature: &str,
        args: &[&str],
        return_type: Option<&str>,
        body: impl FnOnce(&mut Self),
    ) {
        let access = if access.is_empty() {
            String::new()
        } else {
            format!("{} ", access)
        };
        let ret = match return_type {
            Some(t) => format!(" -> {}", t),
            None => String::new(),
        };
        let one_line = format!("{}fn {}({}){}", access, signature, args.join(", "), ret);
        if INDENT.len() * self.indent + one_line.len() < 100 {
            self.block(&one_line, body);
        } else {
            self.emit(&format!("{}fn {}(", access, signature));
            self.indented(|w| {
                for arg in args {
                    w.emit(&format!("{},", arg));
                }
            });
            self.block_with(&format!("){}", ret), ("{", "}"), body);
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}
