#[cfg(test)]
pub async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    let mut idx = 0;
    loop {
        let tmp_dir = std::env::temp_dir().join(format!("rstage_test{}", &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx += 1;
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

#[cfg(test)]
pub async fn setup_log_dir() -> anyhow::Result<std::path::PathBuf> {
    // create a temporary directory
    let tmp_dir = create_temp_dir().await?;
    // src
    // |- app.log
    // |- app.1.log.gz
    // |- current.log -> current.20240101.log
    // |- current.20240101.log
    // |- notes.txt
    // |- nested
    //    |- worker.log
    //    |- worker.2.log
    //    |- latest.log -> (absolute path) .../src/nested/worker.2.log
    let src_path = tmp_dir.join("src");
    tokio::fs::create_dir(&src_path).await.unwrap();
    tokio::fs::write(src_path.join("app.log"), "app").await.unwrap();
    write_gzip(&src_path.join("app.1.log.gz"), "app.1");
    tokio::fs::write(src_path.join("current.20240101.log"), "current")
        .await
        .unwrap();
    tokio::fs::symlink("current.20240101.log", src_path.join("current.log"))
        .await
        .unwrap();
    tokio::fs::write(src_path.join("notes.txt"), "notes")
        .await
        .unwrap();
    let nested_path = src_path.join("nested");
    tokio::fs::create_dir(&nested_path).await.unwrap();
    tokio::fs::write(nested_path.join("worker.log"), "worker")
        .await
        .unwrap();
    tokio::fs::write(nested_path.join("worker.2.log"), "worker.2")
        .await
        .unwrap();
    tokio::fs::symlink(
        nested_path.join("worker.2.log"),
        nested_path.join("latest.log"),
    )
    .await
    .unwrap();
    Ok(tmp_dir)
}

#[cfg(test)]
pub fn directory(root: &std::path::Path) -> crate::directory::Directory {
    crate::directory::Directory::new(
        root.to_path_buf(),
        crate::catalog::LogPattern::logs().unwrap(),
        crate::config::LinkResolution::SingleHop,
    )
}

#[cfg(test)]
pub fn write_gzip(path: &std::path::Path, contents: &str) {
    use std::io::Write;
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

#[cfg(test)]
pub fn read_gzip(path: &std::path::Path) -> String {
    use std::io::Read;
    let file = std::fs::File::open(path).unwrap();
    let mut contents = String::new();
    flate2::read::GzDecoder::new(file)
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

/// Relative paths of all regular files under `root`, sorted.
#[cfg(test)]
pub fn list_files(root: &std::path::Path) -> Vec<String> {
    fn visit(root: &std::path::Path, dir: &std::path::Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                out.push(relative.to_string_lossy().into_owned());
            }
        }
    }
    let mut out = vec![];
    if root.exists() {
        visit(root, root, &mut out);
    }
    out.sort();
    out
}
