use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server};
use surveyor::config::RetrieverConfig;
use surveyor::error::RetrievalError;
use surveyor::retrieval::{PaperRetriever, SearchParams};

fn entry(id: &str, title: &str, published: &str) -> String {
    format!(
        r#"<entry>
    <id>http://arxiv.org/abs/{id}v1</id>
    <updated>{published}</updated>
    <published>{published}</published>
    <title>{title}</title>
    <summary>  An abstract about {title}
      spanning two lines. </summary>
    <author><name>Alice Smith</name></author>
    <author><name>Bob Jones</name></author>
    <arxiv:comment xmlns:arxiv="http://arxiv.org/schemas/atom">12 pages</arxiv:comment>
    <link href="http://arxiv.org/abs/{id}v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>"#
    )
}

fn feed(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  {}
</feed>"#,
        entries.join("\n  ")
    )
}

fn retriever(server: &Server, page_size: usize) -> PaperRetriever {
    retriever_with_retries(server, page_size, 0)
}

fn retriever_with_retries(server: &Server, page_size: usize, num_retries: u32) -> PaperRetriever {
    let config = RetrieverConfig {
        base_url: format!("{}/api/query", server.url()),
        page_size,
        delay_seconds: 0.0,
        num_retries,
        timeout_secs: 5,
    };
    PaperRetriever::new(config).unwrap()
}

#[test]
fn test_fetch_papers_parses_feed() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search_query".into(), "(ti:transformers OR abs:transformers)".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("sortBy".into(), "submittedDate".into()),
            Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
        ]))
        .with_status(200)
        .with_body(feed(&[
            entry("2401.00001", "Sparse Transformers", "2024-01-02T00:00:00Z"),
            entry("2401.00002", "Dense Transformers", "2024-01-01T00:00:00Z"),
        ]))
        .create();

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let params = SearchParams::new("transformers").max_results(5);
    let papers = retriever(&server, 100).try_fetch_papers_at(&params, now).unwrap();

    mock.assert();
    assert_eq!(papers.len(), 2);
    let first = &papers[0];
    assert_eq!(first.id, "2401.00001");
    assert_eq!(first.title, "Sparse Transformers");
    assert_eq!(first.authors, vec!["Alice Smith", "Bob Jones"]);
    assert_eq!(first.abstract_text, "An abstract about Sparse Transformers spanning two lines.");
    assert_eq!(first.primary_category, "cs.LG");
    assert_eq!(first.categories, vec!["cs.LG", "cs.AI"]);
    assert_eq!(first.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2401.00001v1"));
    assert_eq!(first.comment.as_deref(), Some("12 pages"));
    assert_eq!(first.year(), 2024);
}

#[test]
fn test_fetch_papers_filters_by_date_and_pages() {
    let mut server = Server::new();
    let first_page = server
        .mock("GET", "/api/query")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("max_results".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(feed(&[
            entry("2405.00001", "Recent Paper", "2024-05-01T00:00:00Z"),
            entry("2001.00001", "Old Paper", "2020-01-01T00:00:00Z"),
        ]))
        .create();
    let second_page = server
        .mock("GET", "/api/query")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start".into(), "2".into()),
            Matcher::UrlEncoded("max_results".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(feed(&[entry("2404.00001", "Another Recent Paper", "2024-04-01T00:00:00Z")]))
        .create();

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let params = SearchParams::new("graphs").max_results(2).days_back(365);
    let papers = retriever(&server, 2).try_fetch_papers_at(&params, now).unwrap();

    first_page.assert();
    second_page.assert();
    let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2405.00001", "2404.00001"]);
    let threshold = now - chrono::Duration::days(365);
    assert!(papers.iter().all(|p| p.published >= threshold));
}

#[test]
fn test_fetch_papers_stops_at_max_results() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(&[
            entry("2405.00001", "One", "2024-05-01T00:00:00Z"),
            entry("2405.00002", "Two", "2024-05-02T00:00:00Z"),
            entry("2405.00003", "Three", "2024-05-03T00:00:00Z"),
            entry("2405.00004", "Four", "2024-05-04T00:00:00Z"),
        ]))
        .expect(1)
        .create();

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let params = SearchParams::new("robots").max_results(2);
    let papers = retriever(&server, 100).try_fetch_papers_at(&params, now).unwrap();

    mock.assert();
    assert_eq!(papers.len(), 2);
}

#[test]
fn test_fetch_papers_returns_empty_on_http_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body("bad request")
        .create();

    let papers = retriever(&server, 100).fetch_papers(&SearchParams::new("anything"));
    assert!(papers.is_empty());
}

#[test]
fn test_api_error_entry_is_reported() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
<id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
<title>Error</title>
<summary>incorrect id format for 1234</summary>
</entry></feed>"#,
        )
        .create();

    let err = retriever(&server, 100)
        .try_fetch_papers(&SearchParams::new("anything"))
        .unwrap_err();
    assert!(err.to_string().contains("incorrect id format"));
}

#[test]
fn test_get_paper_by_id() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("id_list".into(), "2401.01234".into()))
        .with_status(200)
        .with_body(feed(&[entry("2401.01234", "Found It", "2024-01-05T00:00:00Z")]))
        .create();

    let paper = retriever(&server, 100).get_paper_by_id("2401.01234").unwrap();
    mock.assert();
    assert_eq!(paper.id, "2401.01234");
    assert_eq!(paper.title, "Found It");
}

#[test]
fn test_get_paper_by_id_missing() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(&[]))
        .create();

    assert!(retriever(&server, 100).get_paper_by_id("9999.99999").is_none());
}

#[test]
fn test_search_by_author_and_category() {
    let mut server = Server::new();
    let author = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("search_query".into(), "au:Hinton".into()))
        .with_status(200)
        .with_body(feed(&[entry("2405.00001", "Capsules", &Utc::now().to_rfc3339())]))
        .create();
    let category = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("search_query".into(), "cat:cs.RO".into()))
        .with_status(200)
        .with_body(feed(&[entry("2405.00002", "Grasping", &Utc::now().to_rfc3339())]))
        .create();

    let retriever = retriever(&server, 100);
    assert_eq!(retriever.search_by_author("Hinton", 5)[0].title, "Capsules");
    assert_eq!(retriever.search_by_category("cs.RO", 5)[0].title, "Grasping");
    author.assert();
    category.assert();
}

#[test]
fn test_huge_days_back_disables_date_filter() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(&[entry("9001.00001", "Ancient Paper", "1991-08-01T00:00:00Z")]))
        .create();

    let retriever = retriever(&server, 100);
    for days_back in [i64::MAX, 100_000_000] {
        let params = SearchParams::new("history").max_results(1).days_back(days_back);
        let papers = retriever.fetch_papers(&params);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].id, "9001.00001");
    }
}

#[test]
fn test_server_error_is_retried() {
    let mut server = Server::new();
    let unavailable = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(1)
        .create();
    let ok = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(&[entry("2405.00001", "Second Try", "2024-05-01T00:00:00Z")]))
        .expect(1)
        .create();

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let params = SearchParams::new("retries").max_results(1);
    let papers = retriever_with_retries(&server, 100, 2)
        .try_fetch_papers_at(&params, now)
        .unwrap();

    unavailable.assert();
    ok.assert();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title, "Second Try");
}

#[test]
fn test_client_error_is_not_retried() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(400)
        .expect(1)
        .create();

    let err = retriever_with_retries(&server, 100, 3)
        .try_fetch_papers(&SearchParams::new("anything"))
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, RetrievalError::ApiError(400)));
}

#[test]
fn test_retries_stop_after_limit() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(3)
        .create();

    let err = retriever_with_retries(&server, 100, 2)
        .try_fetch_papers(&SearchParams::new("anything"))
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, RetrievalError::ApiError(503)));
}
