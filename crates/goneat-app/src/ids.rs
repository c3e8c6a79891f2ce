use anyhow::Context;
use camino::Utf8PathBuf;
use goneat_schema::IdIndex;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdListing {
    pub id: String,
    pub path: Utf8PathBuf,
}

/// Every `$id` found under `dirs`, in id order. Fails on conflicting definitions.
pub fn run_ids(dirs: &[Utf8PathBuf]) -> anyhow::Result<Vec<IdListing>> {
    let index = IdIndex::build_from_ref_dirs(dirs).context("build $id index")?;
    Ok(index
        .iter()
        .map(|entry| IdListing {
            id: entry.id.clone(),
            path: entry.path.clone(),
        })
        .collect())
}
