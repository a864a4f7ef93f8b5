use std::{env, fs::File, path::PathBuf, process::Command};

use classkit_jimage::Archive;
use memmap::Mmap;

struct Jdk {
    modules: PathBuf,
    archive: Archive<Mmap>,
}

// The runtime image of the JDK in JAVA_HOME, if there is one.
fn jdk() -> Option<Jdk> {
    let _ = pretty_env_logger::try_init();

    let modules = env::var("JAVA_HOME")
        .map(|home| PathBuf::from(home).join("lib").join("modules"))
        .ok()
        .filter(|modules| modules.is_file());
    let Some(modules) = modules else {
        eprintln!("no JDK in JAVA_HOME, skipping");
        return None;
    };

    let mmap = unsafe { Mmap::map(&File::open(&modules).unwrap()).unwrap() };
    let archive = Archive::parse(mmap).unwrap();
    Some(Jdk { modules, archive })
}

#[test]
fn test_header_matches_jimage_info() {
    let Some(jdk) = jdk() else { return };
    // The jimage tool ships with the JDK but may not be on PATH
    let Ok(info) = Command::new("jimage").arg("info").arg(&jdk.modules).output() else {
        return;
    };

    assert_eq!(
        String::from_utf8_lossy(&info.stdout),
        jdk.archive.header().to_string()
    );
}

#[test]
fn test_resource_name_parts() {
    let Some(jdk) = jdk() else { return };

    let list = jdk.archive.by_name("/java.base/java/util/List.class").unwrap();
    assert_eq!(
        ("java.base", "java/util", "List", "class"),
        (list.module(), list.parent(), list.base(), list.extension())
    );
    assert_eq!("/java.base/java/util/List.class", list.full_name());

    // Top level resources of a module have no parent
    let module_info = jdk.archive.by_name("/java.base/module-info.class").unwrap();
    assert_eq!("", module_info.parent());
    assert_eq!("module-info", module_info.base());
    assert_eq!("/java.base/module-info.class", module_info.full_name());

    assert!(jdk.archive.by_name("/java.base/java/util/Lists.class").is_none());
}

#[test]
fn test_class_resources_are_class_files() {
    let Some(jdk) = jdk() else { return };

    let classes = jdk
        .archive
        .resources()
        .filter(|r| r.module() == "java.base" && r.parent() == "java/lang")
        .filter(|r| r.extension() == "class" && !r.is_compressed())
        .take(50)
        .collect::<Vec<_>>();

    assert!(!classes.is_empty());
    for class in classes {
        assert_eq!(
            &[0xca, 0xfe, 0xba, 0xbe],
            &class.bytes().unwrap()[..4],
            "{}",
            class.full_name()
        );
    }
}

#[test]
fn test_modules_are_searched_in_order() {
    let Some(jdk) = jdk() else { return };

    let string = jdk
        .archive
        .find_class(&["java.sql", "java.base"], "java/lang/String")
        .unwrap();
    assert_eq!("java.base", string.module());
    assert!(jdk
        .archive
        .find_class(&["java.sql"], "java/lang/String")
        .is_none());

    assert_eq!(
        string.bytes().unwrap(),
        jdk.archive
            .class_bytes("java.base", "java/lang/String")
            .unwrap()
            .unwrap()
    );
}
