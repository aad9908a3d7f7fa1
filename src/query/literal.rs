use serde::{Deserialize, Serialize};

/// How string values are turned into SQL literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    /// Single quotes inside a value are doubled.
    #[default]
    Escaped,
    /// Value is wrapped in quotes exactly as entered. A quote in the value
    /// ends the literal early.
    Verbatim,
}

/// Renders every user-supplied string that ends up inside generated SQL.
///
/// Section builders never format a quoted value themselves; they go through
/// this writer so the quoting policy is decided in one place.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralWriter {
    quoting: Quoting,
}

impl LiteralWriter {
    pub fn new(quoting: Quoting) -> Self {
        LiteralWriter { quoting }
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    /// `'value'`
    pub fn quote(&self, value: &str) -> String {
        match self.quoting {
            Quoting::Escaped => format!("'{}'", value.replace('\'', "''")),
            Quoting::Verbatim => format!("'{value}'"),
        }
    }

    /// `('a','b','c')`
    pub fn list<'a, I>(&self, values: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let quoted: Vec<String> = values.into_iter().map(|v| self.quote(v)).collect();
        format!("({})", quoted.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values_render_identically_under_both_policies() {
        let escaped = LiteralWriter::new(Quoting::Escaped);
        let verbatim = LiteralWriter::new(Quoting::Verbatim);
        assert_eq!(escaped.quote("Film-Noir"), "'Film-Noir'");
        assert_eq!(verbatim.quote("Film-Noir"), "'Film-Noir'");
        assert_eq!(
            escaped.list(["Action", "Drama"]),
            verbatim.list(["Action", "Drama"])
        );
    }

    #[test]
    fn test_escaped_doubles_quotes() {
        let w = LiteralWriter::new(Quoting::Escaped);
        assert_eq!(w.quote("Schindler's List"), "'Schindler''s List'");
    }

    #[test]
    fn test_verbatim_leaves_injection_shaped_input_untouched() {
        let w = LiteralWriter::new(Quoting::Verbatim);
        assert_eq!(w.quote("x' OR '1'='1"), "'x' OR '1'='1'");
    }

    #[test]
    fn test_list_keeps_iteration_order() {
        let w = LiteralWriter::default();
        assert_eq!(w.list(["b", "a"]), "('b','a')");
        assert_eq!(w.list(["solo"]), "('solo')");
    }
}
