use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::{LbToolError, TestCase, TESTCASE_SCHEMA_V1};

pub const MAIN_SCRIPT: &str = "main.lua";

/// Collects every `.lua` file under `case_dir`, keyed by relative path.
///
/// A case must provide `main.lua`.
pub fn read_lua_sources(case_dir: &Path) -> Result<BTreeMap<String, String>, LbToolError> {
    let mut sources = BTreeMap::new();

    for entry in WalkDir::new(case_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("lua") {
            continue;
        }

        let Ok(relative) = path.strip_prefix(case_dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        let content = fs::read_to_string(path).map_err(|source| LbToolError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        sources.insert(relative, content);
    }

    if !sources.contains_key(MAIN_SCRIPT) {
        return Err(LbToolError::MainMissing {
            path: case_dir.to_path_buf(),
        });
    }

    Ok(sources)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, LbToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| LbToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| LbToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(LbToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}
