
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// 目录结构：
/// - b.md（最新）, A.md, notes.txt, Zeta/, alpha/
fn populate(root: &Path) {
    std::fs::create_dir(root.join("Zeta")).unwrap();
    std::fs::create_dir(root.join("alpha")).unwrap();
    std::fs::write(root.join("notes.txt"), "plain").unwrap();
    std::fs::write(root.join("A.md"), "# A\n").unwrap();
    std::fs::write(root.join("b.md"), "# 标题 b\n").unwrap();
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    touch(&root.join("A.md"), base);
    touch(&root.join("b.md"), base + Duration::from_secs(60));
}

fn touch(path: &Path, when: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}
