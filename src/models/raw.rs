//! Raw source records as read from drop files

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Source column names as they appear in drop-file headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    Date,
    ClientId,
    ProductId,
    ProductName,
    Units,
    UnitPrice,
}

impl SourceField {
    /// All source fields, in header order
    pub const ALL: [SourceField; 6] = [
        SourceField::Date,
        SourceField::ClientId,
        SourceField::ProductId,
        SourceField::ProductName,
        SourceField::Units,
        SourceField::UnitPrice,
    ];

    /// Header name used by drop files
    pub fn header(&self) -> &'static str {
        match self {
            SourceField::Date => "fecha",
            SourceField::ClientId => "id_cliente",
            SourceField::ProductId => "id_producto",
            SourceField::ProductName => "nombre_producto",
            SourceField::Units => "unidades",
            SourceField::UnitPrice => "precio_unitario",
        }
    }

    /// Resolve a header name (case-insensitive, surrounding whitespace ignored)
    pub fn from_header(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('\u{feff}').to_lowercase();
        Self::ALL.into_iter().find(|f| f.header() == name)
    }

    /// Whether a row may omit this field without it being a defect of the source
    pub fn is_optional(&self) -> bool {
        matches!(self, SourceField::ProductName)
    }
}

/// One source row, unvalidated. Every field is kept as text; missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// File name the row came from
    pub origin_file: String,
    /// Ingestion timestamp (per batch, or per row when the source supplies one)
    pub ingested_at: DateTime<Utc>,
    pub date_text: String,
    pub client_id: String,
    pub product_id: String,
    pub product_name: String,
    pub units_text: String,
    pub price_text: String,
}

impl RawRecord {
    /// Create an empty record for `origin_file`; fields are filled by the reader
    pub fn new(origin_file: impl Into<String>, ingested_at: DateTime<Utc>) -> Self {
        Self {
            origin_file: origin_file.into(),
            ingested_at,
            date_text: String::new(),
            client_id: String::new(),
            product_id: String::new(),
            product_name: String::new(),
            units_text: String::new(),
            price_text: String::new(),
        }
    }

    /// Set a source field by column
    pub fn set(&mut self, field: SourceField, value: String) {
        match field {
            SourceField::Date => self.date_text = value,
            SourceField::ClientId => self.client_id = value,
            SourceField::ProductId => self.product_id = value,
            SourceField::ProductName => self.product_name = value,
            SourceField::Units => self.units_text = value,
            SourceField::UnitPrice => self.price_text = value,
        }
    }

    /// Read a source field by column
    pub fn get(&self, field: SourceField) -> &str {
        match field {
            SourceField::Date => &self.date_text,
            SourceField::ClientId => &self.client_id,
            SourceField::ProductId => &self.product_id,
            SourceField::ProductName => &self.product_name,
            SourceField::Units => &self.units_text,
            SourceField::UnitPrice => &self.price_text,
        }
    }

    /// SHA-256 over the origin file and the six source fields.
    ///
    /// Fields are separated by a unit separator so that shifting text between
    /// adjacent fields changes the hash.
    pub fn row_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.origin_file.as_bytes());
        for field in SourceField::ALL {
            hasher.update([0x1f]);
            hasher.update(self.get(field).as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
