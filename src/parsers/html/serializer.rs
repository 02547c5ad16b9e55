use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

use super::dom::get_body;

/// 序列化节点的全部子节点（不含节点自身的标签）
pub fn serialize_children(node: &Handle) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut buf, &serializable, opts).expect("unable to serialize DOM into buffer");

    String::from_utf8_lossy(&buf).to_string()
}

/// 序列化片段：即 `<body>` 的内容
pub fn serialize_fragment(dom: &RcDom) -> String {
    match get_body(dom) {
        Some(body) => serialize_children(&body),
        None => String::new(),
    }
}
