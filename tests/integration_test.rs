use pastec_batch::config::{Config, RunMode};
use pastec_batch::App;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 在临时目录中准备源 CSV、图片目录和输出目录
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        std::fs::create_dir_all(dir.path().join("images/set")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write_csv(&self, rows: &[(&str, &str)]) {
        let mut content = String::from("\u{feff}ID,Filename,Folder\n");
        for (id, filename) in rows {
            content.push_str(&format!("{},{},set\n", id, filename));
        }
        std::fs::write(self.root().join("images.csv"), content).unwrap();
    }

    fn write_image(&self, filename: &str) {
        std::fs::write(self.root().join("images/set").join(filename), b"\xFF\xD8jpeg").unwrap();
    }

    fn config(&self, server: &MockServer) -> Config {
        Config {
            source_csv: self.root().join("images.csv"),
            base_path: self.root().join("images"),
            images_url: format!("{}/index/images/", server.uri()),
            search_url: format!("{}/index/searcher", server.uri()),
            io_url: format!("{}/index/io", server.uri()),
            add_log_dir: self.root().join("Add_log"),
            search_log_dir: self.root().join("Search_log"),
            request_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root().join(relative)).unwrap_or_default()
    }
}

async fn mount_add_and_save(server: &MockServer, expected_saves: u64) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/index/images/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"type":"IMAGE_ADDED"}"#))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index/io"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"type":"INDEX_WRITTEN"}"#))
        .expect(expected_saves)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submit_three_records_in_two_batches() {
    let server = MockServer::start().await;
    mount_add_and_save(&server, 1).await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "a.jpg"), ("2", "b.jpg"), ("3", "c.jpg")]);
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fixture.write_image(name);
    }

    let config = Config {
        batch_size: 2,
        save_interval: 1000,
        ..fixture.config(&server)
    };
    let app = App::initialize(config, RunMode::Submit).unwrap();
    let summary = assert_ok!(app.run().await);

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.success, 3);
    assert_eq!(summary.checkpoints, 1);

    let results = fixture.read("Add_log/pastec_batch_index_add_log_results.csv");
    let lines: Vec<&str> = results.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "ID,filename,status,response,timestamp");
    assert!(lines[1].starts_with("1,a.jpg,SUCCESS,"));
    assert!(lines[3].starts_with("3,c.jpg,SUCCESS,"));
}

#[tokio::test]
async fn test_submit_missing_resource_is_recorded_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/index/images/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index/io"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("5", "absent.jpg")]);

    let app = App::initialize(fixture.config(&server), RunMode::Submit).unwrap();
    let summary = app.run().await.unwrap();
    assert_eq!(summary.missing, 1);

    let results = fixture.read("Add_log/pastec_batch_index_add_log_results.csv");
    assert!(results.lines().nth(1).unwrap().starts_with("5,absent.jpg,RESOURCE_MISSING,"));

    let missing = fixture.read("Add_log/pastec_batch_index_add_missing_files_log.txt");
    assert_eq!(missing.lines().count(), 1);
    assert!(missing.contains("absent.jpg"));
}

#[tokio::test]
async fn test_search_excludes_self_match() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index/searcher"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"type":"SEARCH_RESULTS","results":[{"image_id":"42","score":0.9},{"image_id":"7","score":0.5}]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index/io"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("7", "q.jpg")]);
    fixture.write_image("q.jpg");

    let app = App::initialize(fixture.config(&server), RunMode::Query).unwrap();
    let summary = app.run().await.unwrap();
    assert_eq!(summary.matches, 1);
    assert_eq!(summary.checkpoints, 0);

    let results = fixture.read("Search_log/pastec_search_results.csv");
    let lines: Vec<&str> = results.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Source_ID,Source_Path,Matched_Image_ID,Match_Score,Match_Tag");
    assert!(lines[1].starts_with("7,"));
    assert!(lines[1].ends_with(",42,0.9,"));
}

#[tokio::test]
async fn test_search_without_matches_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index/searcher"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"type":"SEARCH_RESULTS","results":[{"image_id":"1","score":1.0}]}"#,
        ))
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "only-self.jpg"), ("2", "not-on-disk.jpg")]);
    fixture.write_image("only-self.jpg");

    let app = App::initialize(fixture.config(&server), RunMode::Query).unwrap();
    let summary = app.run().await.unwrap();

    assert_eq!(summary.matches, 0);
    assert_eq!(summary.missing, 1);
    assert_eq!(fixture.read("Search_log/pastec_search_results.csv"), "");
}

#[tokio::test]
async fn test_interval_checkpoints_plus_final() {
    let server = MockServer::start().await;
    // 5 张、间隔 2：跨过 2 和 4 各一次，结束时再一次
    mount_add_and_save(&server, 3).await;

    let fixture = Fixture::new();
    let names: Vec<String> = (1..=5).map(|i| format!("{}.jpg", i)).collect();
    let rows: Vec<(String, String)> = names
        .iter()
        .enumerate()
        .map(|(i, n)| ((i + 1).to_string(), n.clone()))
        .collect();
    let rows: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    fixture.write_csv(&rows);
    for name in &names {
        fixture.write_image(name);
    }

    let config = Config {
        batch_size: 1,
        save_interval: 2,
        ..fixture.config(&server)
    };
    let summary = App::initialize(config, RunMode::Submit).unwrap().run().await.unwrap();
    assert_eq!(summary.checkpoints, 3);
}

#[tokio::test]
async fn test_testing_mode_stops_at_cap_with_single_checkpoint() {
    let server = MockServer::start().await;
    mount_add_and_save(&server, 1).await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "a.jpg"), ("2", "b.jpg"), ("3", "c.jpg"), ("4", "d.jpg")]);
    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        fixture.write_image(name);
    }

    let config = Config {
        batch_size: 2,
        save_interval: 1,
        test_mode: true,
        test_limit: 3,
        ..fixture.config(&server)
    };
    let summary = App::initialize(config, RunMode::Submit).unwrap().run().await.unwrap();

    assert!(summary.stopped_at_cap);
    assert_eq!(summary.total_records, 4);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.checkpoints, 1);
}

#[tokio::test]
async fn test_unreadable_source_aborts_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let app = App::initialize(fixture.config(&server), RunMode::Submit).unwrap();

    assert_err!(app.run().await);
}

#[tokio::test]
async fn test_next_batch_waits_for_previous_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/index/images/.+$"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index/io"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "a.jpg"), ("2", "b.jpg"), ("3", "c.jpg"), ("4", "d.jpg")]);
    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        fixture.write_image(name);
    }

    let config = Config {
        batch_size: 2,
        ..fixture.config(&server)
    };
    let started = Instant::now();
    let summary = App::initialize(config, RunMode::Submit).unwrap().run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.batches, 2);
    // 两批各 300ms：批间串行、批内并发
    assert!(elapsed >= Duration::from_millis(600), "批次之间发生了重叠: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1100), "批内未并发: {:?}", elapsed);

    // 第二批的请求只能在第一批全部完成后到达
    let requests = server.received_requests().await.unwrap();
    let mut first_batch: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path().starts_with("/index/images/"))
        .take(2)
        .map(|r| r.url.path().to_string())
        .collect();
    first_batch.sort();
    assert_eq!(first_batch, vec!["/index/images/1", "/index/images/2"]);
}

#[tokio::test]
async fn test_rejected_checkpoints_do_not_abort_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/index/images/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index/io"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .expect(3)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "a.jpg"), ("2", "b.jpg"), ("3", "c.jpg"), ("4", "d.jpg")]);
    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        fixture.write_image(name);
    }

    let config = Config {
        batch_size: 2,
        save_interval: 2,
        ..fixture.config(&server)
    };
    let summary = assert_ok!(App::initialize(config, RunMode::Submit).unwrap().run().await);

    assert_eq!(summary.checkpoints, 3);
    assert_eq!(summary.success, 4);
    let results = fixture.read("Add_log/pastec_batch_index_add_log_results.csv");
    assert_eq!(results.lines().count(), 5);
}

#[tokio::test]
async fn test_unreachable_checkpoint_endpoint_does_not_abort_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/index/images/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    fixture.write_csv(&[("1", "a.jpg"), ("2", "b.jpg")]);
    fixture.write_image("a.jpg");
    fixture.write_image("b.jpg");

    let config = Config {
        batch_size: 1,
        save_interval: 1,
        // 端口 1 上没有服务
        io_url: "http://127.0.0.1:1/index/io".to_string(),
        ..fixture.config(&server)
    };
    let summary = assert_ok!(App::initialize(config, RunMode::Submit).unwrap().run().await);

    assert_eq!(summary.checkpoints, 3);
    let results = fixture.read("Add_log/pastec_batch_index_add_log_results.csv");
    let lines: Vec<&str> = results.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("1,a.jpg,SUCCESS,"));
    assert!(lines[2].starts_with("2,b.jpg,SUCCESS,"));
}
