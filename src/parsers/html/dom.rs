use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 按给定字符集解码字节并解析；无法识别的字符集按 UTF-8 宽松解码
pub fn html_to_dom(data: &[u8], charset: &str) -> RcDom {
    let text = match Encoding::for_label(charset.trim().as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };
    fragment_to_dom(&text)
}

/// 将 HTML 片段解析为完整文档，片段内容位于 `<body>` 之下
pub fn fragment_to_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// 获取文档的 `<body>` 节点
pub fn get_body(dom: &RcDom) -> Option<Handle> {
    let html = get_child_node_by_name(&dom.document, "html")?;
    get_child_node_by_name(&html, "body")
}

/// 第一个名为 `name` 的直接子元素
pub fn get_child_node_by_name(parent: &Handle, name: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| get_node_name(child) == Some(name))
        .cloned()
}

/// 属性值
pub fn get_node_attr(node: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };
    attrs
        .borrow()
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| attr.value.to_string())
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 节点是否为给定名称之一的元素
pub fn is_element(node: &Handle, names: &[&str]) -> bool {
    get_node_name(node).is_some_and(|name| names.contains(&name))
}

/// 元素是否带有任何属性
pub fn has_attributes(node: &Handle) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => !attrs.borrow().is_empty(),
        _ => false,
    }
}

/// 设置属性；`None` 删除该属性
pub fn set_node_attr(node: &Handle, name: &str, value: Option<String>) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };
    let mut attrs = attrs.borrow_mut();

    match value {
        None => attrs.retain(|attr| &*attr.name.local != name),
        Some(value) => match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
            Some(existing) => existing.value = StrTendril::from(value.as_str()),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(name)),
                value: StrTendril::from(value.as_str()),
            }),
        },
    }
}

/// 创建新的元素节点
pub fn create_element(name: &str, attrs: Vec<Attribute>) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建新的文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// 获取父节点（节点已脱离文档树时返回 None）
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 节点在父节点子列表中的位置
fn index_in_parent(parent: &Handle, child: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|sibling| Rc::ptr_eq(sibling, child))
}

/// 将节点从文档树中摘除
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        if let Some(index) = index_in_parent(&parent, node) {
            parent.children.borrow_mut().remove(index);
        }
    }
    node.parent.set(None);
}

/// 在父节点的指定位置插入子节点
pub fn insert_child_at(parent: &Handle, index: usize, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child.clone());
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    let len = parent.children.borrow().len();
    insert_child_at(parent, len, child);
}

/// 在参考节点之前插入
pub fn insert_before(reference: &Handle, new_node: &Handle) {
    if let Some(parent) = get_parent_node(reference) {
        detach(new_node);
        if let Some(index) = index_in_parent(&parent, reference) {
            insert_child_at(&parent, index, new_node);
        }
    }
}

/// 在参考节点之后插入
pub fn insert_after(reference: &Handle, new_node: &Handle) {
    if let Some(parent) = get_parent_node(reference) {
        detach(new_node);
        if let Some(index) = index_in_parent(&parent, reference) {
            insert_child_at(&parent, index + 1, new_node);
        }
    }
}

/// 将 `from` 的全部子节点移动到 `to` 的末尾
pub fn move_children(from: &Handle, to: &Handle) {
    let children: Vec<Handle> = from.children.borrow_mut().drain(..).collect();
    for child in children {
        child.parent.set(None);
        append_child(to, &child);
    }
}

/// 去掉元素标签但保留其内容
pub fn unwrap_element(node: &Handle) {
    let Some(parent) = get_parent_node(node) else {
        return;
    };
    let Some(index) = index_in_parent(&parent, node) else {
        return;
    };

    let children: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for (offset, child) in children.iter().enumerate() {
        child.parent.set(None);
        insert_child_at(&parent, index + 1 + offset, child);
    }
    detach(node);
}

/// 用新节点替换旧节点
pub fn replace_node(old: &Handle, new_node: &Handle) {
    insert_before(old, new_node);
    detach(old);
}

/// 更换元素的标签名，保留属性与子节点，返回新的元素
pub fn rename_element(node: &Handle, new_name: &str) -> Handle {
    let attrs = match &node.data {
        NodeData::Element { attrs, .. } => attrs.borrow().clone(),
        _ => vec![],
    };
    let renamed = create_element(new_name, attrs);
    move_children(node, &renamed);
    replace_node(node, &renamed);
    renamed
}

/// 先序遍历全部后代节点（不含自身）
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    for child in node.children.borrow().iter() {
        found.push(child.clone());
        found.append(&mut descendants(child));
    }
    found
}

/// 全部后代元素（不含文本、注释等）
pub fn descendant_elements(node: &Handle) -> Vec<Handle> {
    descendants(node)
        .into_iter()
        .filter(|n| matches!(n.data, NodeData::Element { .. }))
        .collect()
}

/// 直接子元素
pub fn child_elements(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|n| matches!(n.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// 由近及远的祖先节点，只包含元素
pub fn ancestors(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut current = get_parent_node(node);
    while let Some(parent) = current {
        if !matches!(parent.data, NodeData::Element { .. }) {
            break;
        }
        current = get_parent_node(&parent);
        found.push(parent);
    }
    found
}

/// 是否存在名称匹配的祖先元素
pub fn has_ancestor(node: &Handle, names: &[&str]) -> bool {
    ancestors(node).iter().any(|a| is_element(a, names))
}

/// 节点下全部文本内容
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        text.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, text);
    }
}

/// 是否为只包含空白的文本节点
pub fn is_whitespace_text(node: &Handle) -> bool {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    }
}

/// 之后的第一个兄弟元素，跳过空白文本
pub fn next_element_sibling(node: &Handle) -> Option<Handle> {
    let parent = get_parent_node(node)?;
    let index = index_in_parent(&parent, node)?;
    let children = parent.children.borrow();
    for sibling in children.iter().skip(index + 1) {
        if is_whitespace_text(sibling) || matches!(sibling.data, NodeData::Comment { .. }) {
            continue;
        }
        return match sibling.data {
            NodeData::Element { .. } => Some(sibling.clone()),
            _ => None,
        };
    }
    None
}

/// 之后的全部兄弟节点
pub fn following_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = get_parent_node(node) else {
        return vec![];
    };
    let Some(index) = index_in_parent(&parent, node) else {
        return vec![];
    };
    let siblings = parent.children.borrow().iter().skip(index + 1).cloned().collect();
    siblings
}

/// 在父节点的子元素中，同名元素之前有多少个
pub fn element_index_among(node: &Handle, names: &[&str]) -> usize {
    let Some(parent) = get_parent_node(node) else {
        return 0;
    };
    let children = parent.children.borrow();
    children
        .iter()
        .take_while(|sibling| !Rc::ptr_eq(sibling, node))
        .filter(|sibling| is_element(sibling, names))
        .count()
}
