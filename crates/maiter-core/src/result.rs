//! Result-file writing: the dump phase that runs once the termination
//! detector signals convergence.

use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::table::StateTable;

/// Writes every primary row this shard owns to `result_dir/part-{shard_id}`,
/// one `key<TAB>value` line per row, where `value` is rendered with
/// `Display`. Copy-vertex replica rows are not dumped — they carry no
/// value of their own, only a delta fanned out to real owners.
pub fn write_result<K, V, D>(
    result_dir: &Path,
    shard_id: usize,
    table: &StateTable<K, V, D>,
) -> Result<usize>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: std::fmt::Display,
{
    std::fs::create_dir_all(result_dir)?;
    let path = result_dir.join(format!("part-{shard_id}"));
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    let mut written = 0usize;
    for key in table.keys() {
        if let Some(value) = table.get_value(&key) {
            writeln!(writer, "{key}\t{value}")?;
            written += 1;
        }
    }
    writer.flush()?;
    tracing::info!(shard_id, written, path = %path.display(), "wrote result file");
    Ok(written)
}
