use std::path::Path;

/// Load key=value pairs from an env file into the process environment.
///
/// Variables already present in the environment always win; the file never
/// overrides them. A missing or unreadable file is a silent no-op so builds
/// without local secrets still run.
///
/// Must be called before the async runtime starts: setting environment
/// variables is only sound while the process is single-threaded.
pub fn load_env_file(path: &Path) {
    let Ok(iter) = dotenvy::from_path_iter(path) else {
        return;
    };
    for (key, value) in iter.flatten() {
        if std::env::var_os(&key).is_none() {
            // Safety: callers invoke this before spawning any threads.
            unsafe { std::env::set_var(&key, &value) };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sets_unset_variables_and_preserves_existing_ones() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let env_path = dir.path().join(".env");
        let mut file = std::fs::File::create(&env_path).expect("create env file");
        writeln!(file, "SITEMETRICS_ENVFILE_TEST_NEW=from-file").expect("write env file");
        writeln!(file, "SITEMETRICS_ENVFILE_TEST_SET=from-file").expect("write env file");

        // Safety: single-threaded test setup.
        unsafe { std::env::set_var("SITEMETRICS_ENVFILE_TEST_SET", "from-process") };
        load_env_file(&env_path);

        assert_eq!(
            std::env::var("SITEMETRICS_ENVFILE_TEST_NEW").expect("new var"),
            "from-file"
        );
        assert_eq!(
            std::env::var("SITEMETRICS_ENVFILE_TEST_SET").expect("existing var"),
            "from-process"
        );
    }

    #[test]
    fn missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().expect("create temp dir");
        load_env_file(&dir.path().join("does-not-exist.env"));
    }
}
