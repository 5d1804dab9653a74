use std::time::Duration;

use super::*;

fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
    let p = dir.join(name);
    let f = std::fs::File::create(&p).unwrap();
    f.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
        .unwrap();
    p
}

#[test]
fn keeps_the_newest_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let newest = touch(d, "c.mp4", 10);
    let middle = touch(d, "b.MOV", 20);
    let oldest = touch(d, "a.mp4", 30);
    let other = touch(d, "notes.txt", 100);

    let removed = keep_last_n(d, 2, VIDEO_EXTENSIONS).unwrap();

    assert_eq!(removed, 1);
    assert!(newest.exists() && middle.exists());
    assert!(!oldest.exists());
    assert!(other.exists());
}

#[test]
fn missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(keep_last_n(&dir.path().join("nope"), 1, &[]).unwrap(), 0);
}

#[test]
fn empty_extension_list_matches_everything() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "x.bin", 5);
    touch(dir.path(), "y", 10);
    assert_eq!(keep_last_n(dir.path(), 0, &[]).unwrap(), 2);
}

#[test]
fn cleanup_drops_only_the_finished_job_and_trims_groups() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    ws.ensure().unwrap();
    let finished = ws.job_temp("42");
    let running = ws.job_temp("7");
    std::fs::create_dir_all(&finished).unwrap();
    std::fs::create_dir_all(&running).unwrap();
    touch(&finished, "xfade_1.mp4", 1);
    let other_frame = touch(&running, "start_walk.png", 1);
    for i in 0..4 {
        touch(&ws.uploads(), &format!("photo{i}.jpg"), 10 + i);
        touch(&ws.renders(), &format!("final{i}.mp4"), 10 + i);
    }
    touch(&ws.renders(), "keep.json", 500);

    let report = cleanup_artifacts(
        &ws,
        &RetentionPolicy {
            keep_last: 3,
            keep_temp: false,
        },
        &finished,
    )
    .unwrap();

    assert_eq!(
        report,
        CleanupReport {
            job_temp_removed: true,
            uploads_removed: 1,
            renders_removed: 1,
        }
    );
    assert!(!finished.exists());
    assert!(other_frame.exists());
    assert!(ws.temp().is_dir());
    assert!(!ws.uploads().join("photo3.jpg").exists());
    assert!(ws.renders().join("final0.mp4").exists());
    assert!(ws.renders().join("keep.json").exists());
}

#[test]
fn shared_temp_root_is_never_removed() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    ws.ensure().unwrap();
    let stray = touch(&ws.temp(), "stray.png", 1);
    let report = cleanup_artifacts(&ws, &RetentionPolicy::default(), &ws.temp()).unwrap();
    assert!(!report.job_temp_removed);
    assert!(stray.exists());
}

#[test]
fn debug_runs_keep_temp() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let job = ws.job_temp("42");
    std::fs::create_dir_all(&job).unwrap();
    let kept = touch(&job, "title.png", 1);
    let report = cleanup_artifacts(
        &ws,
        &RetentionPolicy {
            keep_temp: true,
            ..RetentionPolicy::default()
        },
        &job,
    )
    .unwrap();
    assert!(!report.job_temp_removed);
    assert!(kept.exists());
}

#[test]
fn artifact_paths_live_in_their_directories() {
    let ws = Workspace::new("/data");
    let p = ws.render_path("42_final", "mp4");
    assert_eq!(p.parent(), Some(Path::new("/data/renders")));
    assert!(p.file_name().unwrap().to_str().unwrap().starts_with("42_final_"));
    let job = ws.job_temp("42");
    assert_eq!(job.parent(), Some(Path::new("/data/renders/temp")));
    assert!(ws.is_job_temp(&job));
    assert!(!ws.is_job_temp(&ws.temp()));
    assert_ne!(job, ws.job_temp("42"));
}
