use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical categories every model-suggested label is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Facturas,
    Newsletter,
    Trabajo,
    Personal,
    Soporte,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::Facturas,
        Label::Newsletter,
        Label::Trabajo,
        Label::Personal,
        Label::Soporte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Facturas => "facturas",
            Label::Newsletter => "newsletter",
            Label::Trabajo => "trabajo",
            Label::Personal => "personal",
            Label::Soporte => "soporte",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Order matters for the containment fallback: first key found wins.
const LABEL_TABLE: &[(&str, Label)] = &[
    ("factura", Label::Facturas),
    ("facturas", Label::Facturas),
    ("pagos", Label::Facturas),
    ("recibos", Label::Facturas),
    ("cobros", Label::Facturas),
    ("newsletter", Label::Newsletter),
    ("newsletters", Label::Newsletter),
    ("promociones", Label::Newsletter),
    ("trabajo", Label::Trabajo),
    ("proyectos", Label::Trabajo),
    ("reuniones", Label::Trabajo),
    ("personal", Label::Personal),
    ("soporte", Label::Soporte),
    ("incidencias", Label::Soporte),
    ("reunión", Label::Trabajo),
    ("reunion", Label::Trabajo),
    ("invoice", Label::Facturas),
    ("invoices", Label::Facturas),
    ("billing", Label::Facturas),
    ("payment", Label::Facturas),
    ("payments", Label::Facturas),
    ("receipt", Label::Facturas),
    ("receipts", Label::Facturas),
    ("promotions", Label::Newsletter),
    ("marketing", Label::Newsletter),
    ("work", Label::Trabajo),
    ("project", Label::Trabajo),
    ("projects", Label::Trabajo),
    ("meeting", Label::Trabajo),
    ("meetings", Label::Trabajo),
    ("support", Label::Soporte),
    ("incident", Label::Soporte),
    ("incidents", Label::Soporte),
];

/// Map a free-text label onto the canonical taxonomy.
///
/// The label is trimmed and lowercased, then looked up exactly; failing
/// that, the first table key contained in the label is used. Anything else
/// yields `None`, so model free text never leaks through.
pub fn normalize_label(raw: &str) -> Option<Label> {
    let label = raw.trim().to_lowercase();
    if label.is_empty() {
        return None;
    }

    if let Some((_, mapped)) = LABEL_TABLE.iter().find(|(key, _)| *key == label) {
        return Some(*mapped);
    }

    LABEL_TABLE
        .iter()
        .find(|(key, _)| label.contains(key))
        .map(|(_, mapped)| *mapped)
}
