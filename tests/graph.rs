//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use guru_bundle::utils::url::md5_hex;
    use guru_bundle::{Bundle, BundleOptions, NodeInput, Position};

    fn bundle_with(ids: &[&str]) -> Bundle {
        let mut bundle = Bundle::new("graph", BundleOptions::default()).unwrap();
        for id in ids {
            bundle.upsert(NodeInput::new().id(*id).title(*id)).unwrap();
        }
        bundle
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut bundle = bundle_with(&[]);
        let input = NodeInput::new()
            .id("page")
            .title("Page")
            .content("<p>x</p>")
            .tag("faq");

        let first = bundle.upsert(input.clone()).unwrap();
        let second = bundle.upsert(input).unwrap();

        assert_eq!(first, second);
        assert_eq!(bundle.nodes().count(), 1);
        let node = bundle.node("page").unwrap();
        assert_eq!(node.tags, vec!["faq".to_string()]);
        assert_eq!(node.content, "<p>x</p>");
    }

    #[test]
    fn upsert_merges_non_empty_fields() {
        let mut bundle = bundle_with(&[]);
        bundle
            .upsert(NodeInput::new().id("page").title("Old").url("https://ex.com/p"))
            .unwrap();
        bundle
            .upsert(NodeInput::new().id("page").content("<p>new</p>"))
            .unwrap();

        let node = bundle.node("page").unwrap();
        assert_eq!(node.title, "Old");
        assert_eq!(node.url, "https://ex.com/p");
        assert_eq!(node.content, "<p>new</p>");
    }

    #[test]
    fn upsert_derives_id_from_url() {
        let mut bundle = bundle_with(&[]);
        let id = bundle
            .upsert(NodeInput::new().url("https://ex.com/page"))
            .unwrap();
        assert_eq!(id, md5_hex("https://ex.com/page"));
    }

    #[test]
    fn upsert_normalizes_content_unless_told_not_to() {
        let mut bundle = bundle_with(&[]);
        bundle
            .upsert(NodeInput::new().id("a").content("<div><p></p><span>x</span></div>"))
            .unwrap();
        bundle
            .upsert(NodeInput::new().id("b").content("<span>x</span>").skip_normalize())
            .unwrap();

        assert_eq!(bundle.node("a").unwrap().content, "<div>x</div>");
        assert_eq!(bundle.node("b").unwrap().content, "<span>x</span>");
    }

    #[test]
    fn children_keep_insertion_positions() {
        let mut bundle = bundle_with(&["p", "a", "b", "c", "d"]);
        bundle.add_child("p", "a", Position::End).unwrap();
        bundle.add_child("p", "b", Position::End).unwrap();
        bundle.add_child("p", "c", Position::First).unwrap();
        bundle
            .add_child("p", "d", Position::After("c".to_string()))
            .unwrap();

        assert_eq!(bundle.node("p").unwrap().children(), ["c", "d", "a", "b"]);
        assert_eq!(bundle.node("a").unwrap().parents(), ["p"]);
    }

    #[test]
    fn adding_the_same_child_twice_changes_nothing() {
        let mut bundle = bundle_with(&["p", "c"]);
        bundle.add_child("p", "c", Position::End).unwrap();
        bundle.add_child("p", "c", Position::First).unwrap();

        assert_eq!(bundle.node("p").unwrap().children(), ["c"]);
        assert_eq!(bundle.node("c").unwrap().parents(), ["p"]);
    }

    #[test]
    fn node_can_have_several_parents() {
        let mut bundle = bundle_with(&["p1", "p2", "shared"]);
        bundle.add_child("p1", "shared", Position::End).unwrap();
        bundle.add_child("p2", "shared", Position::End).unwrap();

        assert_eq!(bundle.node("shared").unwrap().parents(), ["p1", "p2"]);
        let ancestors: Vec<String> = bundle.ancestors_of("shared").into_iter().collect();
        assert_eq!(ancestors, vec!["p1", "p2"]);
    }

    #[test]
    fn move_to_reparents() {
        let mut bundle = bundle_with(&["a", "b", "x"]);
        bundle.add_child("a", "x", Position::End).unwrap();
        bundle.move_to("x", "b", Position::End).unwrap();

        assert!(bundle.node("a").unwrap().children().is_empty());
        assert_eq!(bundle.node("b").unwrap().children(), ["x"]);
        assert_eq!(bundle.node("x").unwrap().parents(), ["b"]);
    }

    #[test]
    fn remove_promotes_children_to_roots() {
        let mut bundle = bundle_with(&["p", "c"]);
        bundle.add_child("p", "c", Position::End).unwrap();

        let removed = bundle.remove("p").unwrap();
        assert_eq!(removed.id, "p");
        assert!(bundle.node("p").is_none());
        assert!(bundle.node("c").unwrap().is_root());
    }

    #[test]
    fn remove_cascading_unlinks_the_subtree() {
        let mut bundle = bundle_with(&["root", "mid", "leaf", "other"]);
        bundle.add_child("root", "mid", Position::End).unwrap();
        bundle.add_child("mid", "leaf", Position::End).unwrap();
        bundle.add_child("other", "leaf", Position::End).unwrap();

        assert_eq!(bundle.remove_cascading("mid").unwrap(), 2);

        assert!(bundle.node("mid").unwrap().is_removed());
        assert!(bundle.node("leaf").unwrap().is_removed());
        assert!(bundle.node("root").unwrap().children().is_empty());
        assert!(bundle.node("other").unwrap().children().is_empty());
        assert!(bundle.node("leaf").unwrap().parents().is_empty());
        assert!(!bundle.node("root").unwrap().is_removed());
    }

    #[test]
    fn tree_reflects_structure() {
        let mut bundle = bundle_with(&["a", "b"]);
        bundle.add_child("a", "b", Position::End).unwrap();
        assert_eq!(bundle.tree(), "[+] a (a)\n  [-] b (b)\n");
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use guru_bundle::{Bundle, BundleError, BundleOptions, NodeInput, Position};

    fn chain() -> Bundle {
        let mut bundle = Bundle::new("graph", BundleOptions::default()).unwrap();
        for id in ["a", "b", "c"] {
            bundle.upsert(NodeInput::new().id(id)).unwrap();
        }
        bundle.add_child("a", "b", Position::End).unwrap();
        bundle.add_child("b", "c", Position::End).unwrap();
        bundle
    }

    #[test]
    fn cycle_is_rejected_and_graph_unchanged() {
        let mut bundle = chain();
        let before = bundle.tree();

        let result = bundle.add_child("c", "a", Position::End);
        assert!(matches!(result, Err(BundleError::Cycle { .. })));
        assert_eq!(bundle.tree(), before);
        assert!(bundle.node("c").unwrap().children().is_empty());
        assert!(bundle.node("a").unwrap().parents().is_empty());
    }

    #[test]
    fn node_cannot_be_its_own_child() {
        let mut bundle = chain();
        assert!(matches!(
            bundle.add_child("b", "b", Position::End),
            Err(BundleError::Cycle { .. })
        ));
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut bundle = chain();
        assert!(matches!(
            bundle.move_to("a", "c", Position::End),
            Err(BundleError::Cycle { .. })
        ));
        assert_eq!(bundle.node("b").unwrap().parents(), ["a"]);
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let mut bundle = chain();
        assert!(matches!(
            bundle.add_child("a", "missing", Position::End),
            Err(BundleError::NodeNotFound(_))
        ));
        assert!(matches!(bundle.remove("missing"), Err(BundleError::NodeNotFound(_))));
    }

    #[test]
    fn upsert_needs_id_or_url() {
        let mut bundle = chain();
        assert!(matches!(
            bundle.upsert(NodeInput::new().title("anonymous")),
            Err(BundleError::MissingIdentity)
        ));
    }
}
