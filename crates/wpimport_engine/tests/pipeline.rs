use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use scraper::{Html, Selector};
use tempfile::TempDir;
use wpimport_core::{parse_utc_offset, RunPolicy, RunSummary, DEFAULT_UTC_OFFSET};
use wpimport_engine::{
    ContentStore, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, ImageImporter,
    ImageRehoster, ImportError, ImportOptions, Importer, MediaStorage, SqliteStore, StoreError,
};

/// Serves canned responses and records every requested URL.
#[derive(Default)]
struct FakeFetcher {
    responses: HashMap<String, Result<Vec<u8>, FailureKind>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    fn with(mut self, url: &str, response: Result<&[u8], FailureKind>) -> Self {
        self.responses
            .insert(url.to_string(), response.map(<[u8]>::to_vec));
        self
    }

    /// Handle on the request log that outlives boxing the fetcher.
    fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requested)
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(bytes)) => Ok(FetchOutput {
                bytes: bytes.clone(),
                metadata: FetchMetadata {
                    final_url: url.to_string(),
                    content_type: Some("image/png".to_string()),
                    byte_len: bytes.len() as u64,
                },
            }),
            Some(Err(kind)) => Err(FetchError::new(kind.clone(), "fake failure")),
            None => Err(FetchError::new(FailureKind::Network, "connection refused")),
        }
    }
}

/// Rehoster that never touches the network, for pipeline-only tests.
struct NoImages;

impl ImageRehoster for NoImages {
    fn rehost(&self, _url: &str) -> Result<Option<String>, ImportError> {
        Ok(None)
    }
}

fn options(policy: RunPolicy) -> ImportOptions {
    ImportOptions {
        internal_domain: "djangocentral".to_string(),
        utc_offset: parse_utc_offset(DEFAULT_UTC_OFFSET).unwrap(),
        policy,
    }
}

fn admin_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create_user("admin").unwrap();
    store
}

fn item(title: &str, link: &str, date: &str, content: &str, terms: &str) -> String {
    format!(
        r#"<item>
            <title>{title}</title>
            <link>{link}</link>
            <content:encoded><![CDATA[{content}]]></content:encoded>
            <wp:post_date>{date}</wp:post_date>
            {terms}
        </item>"#
    )
}

fn export(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:wp="http://wordpress.org/export/1.2/">
<channel>{}</channel>
</rss>"#,
        items.join("\n")
    )
}

fn img_attr(html: &str, attr: &str) -> Vec<Option<String>> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").unwrap();
    fragment
        .select(&selector)
        .map(|img| img.value().attr(attr).map(str::to_string))
        .collect()
}

fn init_logging() {
    import_logging::initialize_for_tests();
}

#[test]
fn full_import_rehosts_images_and_persists_articles() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = admin_store();
    let fetcher = FakeFetcher::default()
        .with("http://img.example/a.png", Ok(&b"png-bytes"[..]))
        .with("http://img.example/missing.png", Err(FailureKind::HttpStatus(404)));
    let media = MediaStorage::new(temp.path(), "articles", "/media/");
    let images = ImageImporter::new(Box::new(fetcher), media, &store).unwrap();
    let importer = Importer::new(&store, &images, options(RunPolicy::AbortOnError), "admin").unwrap();

    let xml = export(&[item(
        "Hello World",
        "https://blog.example/?p=123",
        "2020-01-01 10:00:00",
        r#"<p><img src="http://img.example/a.png" srcset="http://img.example/a-2x.png 2x"><img src="http://img.example/missing.png"><a href="http://external.com">out</a><a href="https://djangocentral.example/x">in</a></p>"#,
        r#"<category domain="category" nicename="python"><![CDATA[Python]]></category>
           <category domain="post_tag" nicename="django"><![CDATA[Django]]></category>"#,
    )]);

    let summary = importer.run_xml(&xml).unwrap();
    assert_eq!(
        summary,
        RunSummary {
            total: 1,
            created: 1,
            skipped: 0,
            failed: 0,
            halted: false,
        }
    );

    let article = store.article("Hello World").unwrap().unwrap();
    assert_eq!(article.slug, "hello-world");
    assert_eq!(article.category, "python");
    assert_eq!(article.author, "admin");
    assert_eq!(article.posted_at, "2020-01-01T10:00:00+05:30");
    assert_eq!(article.tags, BTreeSet::from(["django".to_string()]));
    assert_eq!(
        img_attr(&article.content, "src"),
        vec![Some("/media/articles/a.png".to_string()), Some(String::new())]
    );
    assert_eq!(
        img_attr(&article.content, "srcset"),
        vec![Some(String::new()), Some(String::new())]
    );
    assert!(article
        .content
        .contains(r#"<a href="http://external.com" rel="nofollow noopener noreferrer" target="_blank">out</a>"#));
    assert!(article
        .content
        .contains(r#"<a href="https://djangocentral.example/x">in</a>"#));

    let attachments = store.attachments().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "a.png");
    assert_eq!(
        std::fs::read(temp.path().join("articles").join("a.png")).unwrap(),
        b"png-bytes"
    );
}

#[test]
fn second_run_creates_nothing() {
    init_logging();
    let store = admin_store();
    let importer = Importer::new(&store, &NoImages, options(RunPolicy::AbortOnError), "admin").unwrap();
    let xml = export(&[
        item("One", "https://b.example/one/", "2020-01-01 10:00:00", "<p>1</p>", ""),
        item("Two", "https://b.example/two/", "2020-01-02 10:00:00", "<p>2</p>", ""),
    ]);

    let first = importer.run_xml(&xml).unwrap();
    assert_eq!(first.created, 2);
    let second = importer.run_xml(&xml).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(store.article_count().unwrap(), 2);
}

#[test]
fn categories_are_shared_between_items() {
    init_logging();
    let store = admin_store();
    let importer = Importer::new(&store, &NoImages, options(RunPolicy::AbortOnError), "admin").unwrap();
    let xml = export(&[
        item(
            "A",
            "https://b.example/a/",
            "2020-01-01 10:00:00",
            "",
            r#"<category domain="category">Rust</category>"#,
        ),
        item(
            "B",
            "https://b.example/b/",
            "2020-01-01 10:00:00",
            "",
            r#"<category domain="category">RUST</category>"#,
        ),
    ]);

    importer.run_xml(&xml).unwrap();
    assert_eq!(store.category_names().unwrap(), vec!["rust"]);
}

#[test]
fn abort_policy_stops_at_bad_timestamp_and_keeps_earlier_work() {
    init_logging();
    let store = admin_store();
    let importer = Importer::new(&store, &NoImages, options(RunPolicy::AbortOnError), "admin").unwrap();
    let xml = export(&[
        item("Good", "https://b.example/good/", "2020-01-01 10:00:00", "", ""),
        item("Draft", "https://b.example/draft/", "0000-00-00 00:00:00", "", ""),
        item("Later", "https://b.example/later/", "2020-01-03 10:00:00", "", ""),
    ]);

    let summary = importer.run_xml(&xml).unwrap();
    assert!(summary.halted);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert!(store.article_exists("Good").unwrap());
    assert!(!store.article_exists("Later").unwrap());
}

#[test]
fn continue_policy_imports_the_rest() {
    init_logging();
    let store = admin_store();
    let importer =
        Importer::new(&store, &NoImages, options(RunPolicy::ContinueOnError), "admin").unwrap();
    let xml = export(&[
        item("Draft", "https://b.example/draft/", "not a date", "", ""),
        item("Later", "https://b.example/later/", "2020-01-03 10:00:00", "", ""),
    ]);

    let summary = importer.run_xml(&xml).unwrap();
    assert!(!summary.halted);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);
    assert!(store.article_exists("Later").unwrap());
}

#[test]
fn missing_author_fails_before_any_item() {
    let store = SqliteStore::open_in_memory().unwrap();
    let result = Importer::new(&store, &NoImages, options(RunPolicy::AbortOnError), "admin");
    assert!(matches!(
        result,
        Err(ImportError::Store(StoreError::AuthorNotFound(_)))
    ));
}

#[test]
fn malformed_export_is_fatal() {
    let store = admin_store();
    let importer = Importer::new(&store, &NoImages, options(RunPolicy::ContinueOnError), "admin").unwrap();
    assert!(matches!(
        importer.run_xml("<rss><channel>"),
        Err(ImportError::Wxr(_))
    ));
}

#[test]
fn unreachable_and_relative_images_are_dropped() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = admin_store();
    let fetcher = FakeFetcher::default().with("https://b.example/wp-content/rel.png", Ok(&b"rel"[..]));
    let media = MediaStorage::new(temp.path(), "articles", "/media/");
    let images = ImageImporter::new(Box::new(fetcher), media, &store).unwrap();
    let importer = Importer::new(&store, &images, options(RunPolicy::AbortOnError), "admin").unwrap();

    let xml = export(&[item(
        "Images",
        "https://b.example/images/",
        "2020-01-01 10:00:00",
        r#"<img src="http://down.example/x.png"><img src="/wp-content/rel.png"><img src="data:image/png;base64,AAAA">"#,
        "",
    )]);

    let summary = importer.run_xml(&xml).unwrap();
    assert_eq!(summary.created, 1);
    let article = store.article("Images").unwrap().unwrap();
    assert_eq!(
        img_attr(&article.content, "src"),
        vec![
            Some(String::new()),
            Some("/media/articles/rel.png".to_string()),
            Some(String::new()),
        ]
    );
    assert_eq!(store.attachments().unwrap().len(), 1);
}

#[test]
fn repeated_image_is_downloaded_once_per_item() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = admin_store();
    let fetcher = FakeFetcher::default().with("http://img.example/a.png", Ok(&b"a"[..]));
    let requested = fetcher.requests();
    let media = MediaStorage::new(temp.path(), "articles", "/media/");
    let images = ImageImporter::new(Box::new(fetcher), media, &store).unwrap();

    assert_eq!(
        images.rehost("http://img.example/a.png").unwrap().as_deref(),
        Some("/media/articles/a.png")
    );

    let importer = Importer::new(&store, &images, options(RunPolicy::AbortOnError), "admin").unwrap();
    let xml = export(&[item(
        "Twice",
        "https://b.example/twice/",
        "2020-01-01 10:00:00",
        r#"<img src="http://img.example/a.png"><img src="http://img.example/a.png">"#,
        "",
    )]);
    importer.run_xml(&xml).unwrap();

    assert_eq!(
        *requested.lock().unwrap(),
        vec!["http://img.example/a.png".to_string(); 2]
    );
    let attachments = store.attachments().unwrap();
    assert_eq!(attachments.len(), 2);
    assert_ne!(attachments[0].name, attachments[1].name);
    let article = store.article("Twice").unwrap().unwrap();
    let srcs = img_attr(&article.content, "src");
    assert_eq!(srcs[0], srcs[1]);
    assert_eq!(srcs[0].as_deref(), Some(attachments[1].url.as_str()));
}
