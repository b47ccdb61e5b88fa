//! Demo sales drop
//!
//! A fixed CSV that exercises every path of the pipeline: valid rows, an exact
//! duplicate, a same-key resubmission with new values and malformed rows.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::sinks::SinkError;
use crate::sinks::atomic::AtomicFile;

/// File name of the demo drop
pub const SAMPLE_FILE_NAME: &str = "ventas_ejemplo.csv";

const SAMPLE_CSV: &str = "\
fecha,id_cliente,id_producto,nombre_producto,unidades,precio_unitario
2025-01-03,C001,P010,Cafe premium,2,12.50
2025-01-04,C002,P010,Cafe premium,1,12.50
2025-01-04,C001,P020,Te especial,3,\"8,00\"
2025-01-05,C003,P020,Te especial,1,8.00
2025-01-05,C003,P020,Te especial,-1,8.00
2025-01-06,C004,P099,,2,doce
2025-01-04,C002,P010,Cafe premium,1,12.50
2025-01-05,C003,P020,Te especial,4,8.00
2025/13/45,Cliente123,P030,,diez,5.00
2025-01-07,C005,P030,Chocolate,0,-3
2025-01-07,C006,P040,Aceite de oliva,5,18.25
";

/// Contents of the demo drop
pub fn sample_csv() -> &'static str {
    SAMPLE_CSV
}

/// Write the demo drop into `dir`.
///
/// An existing file is kept unless `force` is set; the returned flag tells whether
/// the file was written.
pub fn write_sample(dir: &Path, force: bool) -> Result<(PathBuf, bool), SinkError> {
    let path = dir.join(SAMPLE_FILE_NAME);
    if path.exists() && !force {
        tracing::info!(path = %path.display(), "Sample drop already present");
        return Ok((path, false));
    }

    let file = AtomicFile::create(&path)?;
    {
        let mut writer = file.writer()?;
        writer
            .write_all(SAMPLE_CSV.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| SinkError::io(file.tmp_path(), e))?;
    }
    file.commit()?;

    tracing::info!(path = %path.display(), "Wrote sample drop");
    Ok((path, true))
}
