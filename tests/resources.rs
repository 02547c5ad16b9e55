//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

mod common;

#[cfg(test)]
mod passing {
    use std::fs;
    use std::path::Path;

    use guru_bundle::utils::url::resource_id;
    use guru_bundle::{Bundle, CompileHooks, HttpDownloader, Node, NodeInput, Position};

    use crate::common::{bundle_in, read, write_file};

    fn folder_with(bundle: &mut Bundle, pages: &[(&str, &str, &str)]) {
        bundle.upsert(NodeInput::new().id("docs").title("Docs")).unwrap();
        for (id, url, content) in pages {
            bundle
                .upsert(NodeInput::new().id(*id).url(*url).content(*content))
                .unwrap();
            bundle.add_child("docs", id, Position::End).unwrap();
        }
    }

    #[test]
    fn shared_resource_is_downloaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(&dir, "dedup");
        folder_with(
            &mut bundle,
            &[
                (
                    "a",
                    "https://example.com/docs/a",
                    "<p><img src=\"img/logo.png\"><img src=\"img/logo.png\"></p>",
                ),
                (
                    "b",
                    "https://example.com/docs/sub/b",
                    "<p><img src=\"../img/logo.png\"></p>",
                ),
            ],
        );

        let mut calls: Vec<String> = Vec::new();
        let mut hook = |url: &str, path: &Path, _bundle: &Bundle, _node: &Node| {
            calls.push(url.to_string());
            fs::write(path, b"png").is_ok()
        };
        let report = bundle
            .zip_with(CompileHooks::new().with_downloader(&mut hook))
            .unwrap();

        assert_eq!(calls, vec!["https://example.com/docs/img/logo.png"]);
        let relative = format!(
            "resources/{}",
            resource_id("https://example.com/docs/img/logo.png")
        );
        assert!(relative.ends_with(".png"));
        assert!(report.run_dir.join(&relative).is_file());
        assert_eq!(report.resources, 1);

        assert_eq!(
            read(&report.run_dir.join("cards/a.html")),
            format!("<p><img src=\"{0}\"><img src=\"{0}\"></p>", relative)
        );
        assert_eq!(
            read(&report.run_dir.join("cards/b.html")),
            format!("<p><img src=\"{}\"></p>", relative)
        );
        assert_eq!(bundle.log().events_with_message("Resource downloaded").count(), 1);
    }

    #[test]
    fn failed_download_keeps_absolute_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(&dir, "failed");
        folder_with(
            &mut bundle,
            &[("a", "https://ex.com/a/b", "<p><img src=\"/logo.png\"></p>")],
        );

        let mut hook = |_: &str, _: &Path, _: &Bundle, _: &Node| (404u16, 0u64);
        let report = bundle
            .zip_with(CompileHooks::new().with_downloader(&mut hook))
            .unwrap();

        assert_eq!(
            read(&report.run_dir.join("cards/a.html")),
            "<p><img src=\"https://ex.com/logo.png\"></p>"
        );
        assert_eq!(report.resources, 0);

        let event = bundle
            .log()
            .events_with_message("Resource download failed, kept external url")
            .next()
            .unwrap();
        assert_eq!(event.field("status"), Some("404"));
        assert_eq!(event.field("node"), Some("a"));
    }

    #[test]
    fn links_to_other_nodes_are_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(&dir, "links");
        folder_with(
            &mut bundle,
            &[
                (
                    "a",
                    "https://ex.com/a",
                    "<p><a href=\"/b#sec\">B</a> <a href=\"https://ex.com/p\">P</a> <img src=\"x.png\"></p>",
                ),
                ("b", "https://ex.com/b", "<p>b</p>"),
            ],
        );
        bundle.upsert(NodeInput::new().id("p").url("https://ex.com/p")).unwrap();
        bundle.upsert(NodeInput::new().id("c").content("<p>c</p>")).unwrap();
        bundle.add_child("p", "c", Position::End).unwrap();

        let report = bundle.zip().unwrap();

        assert_eq!(
            read(&report.run_dir.join("cards/a.html")),
            "<p><a href=\"cards/b\">B</a> <a href=\"folders/p\">P</a> <img src=\"https://ex.com/x.png\"></p>"
        );
    }

    #[test]
    fn custom_link_matcher() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(&dir, "matcher");
        folder_with(
            &mut bundle,
            &[
                (
                    "a",
                    "https://ex.com/a",
                    "<p><a href=\"https://legacy.ex.com/old\">old</a></p>",
                ),
                ("b", "https://ex.com/b", "<p>b</p>"),
            ],
        );

        let matcher = |node: &Node, url: &str| node.id == "b" && url.contains("legacy");
        let report = bundle
            .zip_with(CompileHooks::new().with_link_matcher(&matcher))
            .unwrap();

        assert_eq!(
            read(&report.run_dir.join("cards/a.html")),
            "<p><a href=\"cards/b\">old</a></p>"
        );
    }

    #[test]
    fn skipped_references_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(&dir, "skipped");
        let content = "<p><a href=\"#top\">top</a> <a href=\"mailto:a@ex.com\">mail</a></p>";
        folder_with(&mut bundle, &[("a", "https://ex.com/a", content)]);

        let report = bundle.zip().unwrap();
        assert_eq!(read(&report.run_dir.join("cards/a.html")), content);
    }

    #[test]
    fn local_files_are_copied_and_broken_ones_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        write_file(&site, "img.png", "png");
        write_file(&site, "doc.html", "");
        let page_url = site.join("doc.html").to_string_lossy().to_string();

        let mut bundle = bundle_in(&dir, "local");
        folder_with(
            &mut bundle,
            &[(
                "doc",
                page_url.as_str(),
                "<p><img src=\"img.png\"><img src=\"missing.png\"><a href=\"missing.pdf\">file</a></p>",
            )],
        );

        let report = bundle.zip().unwrap();

        let relative = format!(
            "resources/{}",
            resource_id(&site.join("img.png").to_string_lossy())
        );
        assert_eq!(
            read(&report.run_dir.join("cards/doc.html")),
            format!("<p><img src=\"{}\">file</p>", relative)
        );
        assert_eq!(read(&report.run_dir.join(&relative)), "png");
        assert_eq!(bundle.log().events_with_message("Resource copied").count(), 1);
        assert_eq!(
            bundle
                .log()
                .events_with_message("Resource copy failed, reference dropped")
                .count(),
            2
        );
    }

    #[test]
    fn http_downloader_leaves_linked_pages_alone() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        write_file(&site, "img.png", "png");
        write_file(&site, "other.html", "<p>other</p>");
        write_file(&site, "doc.html", "");
        let page_url = site.join("doc.html").to_string_lossy().to_string();

        let mut bundle = bundle_in(&dir, "pages");
        folder_with(
            &mut bundle,
            &[(
                "doc",
                page_url.as_str(),
                "<p><a href=\"other.html\">other</a><img src=\"img.png\"></p>",
            )],
        );

        let mut downloader = HttpDownloader::new().unwrap();
        let report = bundle
            .zip_with(CompileHooks::new().with_downloader(&mut downloader))
            .unwrap();

        let image = format!(
            "resources/{}",
            resource_id(&site.join("img.png").to_string_lossy())
        );
        let page = site.join("other.html").to_string_lossy().to_string();
        assert_eq!(
            read(&report.run_dir.join("cards/doc.html")),
            format!("<p><a href=\"{}\">other</a><img src=\"{}\"></p>", page, image)
        );
        assert_eq!(read(&report.run_dir.join(&image)), "png");
        assert_eq!(report.resources, 1);
        assert!(!report
            .run_dir
            .join("resources")
            .join(resource_id(&page))
            .exists());
    }
}
