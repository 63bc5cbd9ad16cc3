use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use weft::{
    async_replace, async_replace_with, class_map, element_ref, guard, html, keyed, live, repeat,
    repeat_unkeyed, unsafe_html, unsafe_svg, ElementRef, EngineConfig, Host, MemoryHost, NodeId,
    Producer, Renderer, TemplateResult, Value,
};

fn setup() -> (Renderer, NodeId) {
    let mut host = MemoryHost::new();
    let container = host.create_element("div");
    (Renderer::new(host, &EngineConfig::new().with_marker_seed(3)), container)
}

fn keyed_list(items: &[i32]) -> TemplateResult {
    html!("<ul>", "</ul>"; repeat(items.to_vec(), |n, _| *n, |n, _| html!("<li>", "</li>"; *n)))
}

#[test]
fn test_repeat_moves_existing_nodes() {
    let (mut r, container) = setup();
    r.render(keyed_list(&[0, 1, 2, 3, 4]), container).unwrap();
    let before = r.host().find_all(container, "li");
    assert_eq!(before.len(), 5);

    r.render(keyed_list(&[2, 0, 3, 5, 1, 4]), container).unwrap();
    assert_eq!(
        r.host().rendered_html(container),
        "<ul><li>2</li><li>0</li><li>3</li><li>5</li><li>1</li><li>4</li></ul>"
    );
    let after = r.host().find_all(container, "li");
    assert_eq!(
        after,
        vec![before[2], before[0], before[3], after[3], before[1], before[4]]
    );
    assert!(!before.contains(&after[3]));
}

#[test]
fn test_repeat_removes_and_reverses() {
    let (mut r, container) = setup();
    r.render(keyed_list(&[1, 2, 3, 4]), container).unwrap();
    let before = r.host().find_all(container, "li");

    r.render(keyed_list(&[4, 2]), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<ul><li>4</li><li>2</li></ul>");
    assert_eq!(r.host().find_all(container, "li"), vec![before[3], before[1]]);

    r.render(keyed_list(&[]), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<ul></ul>");
}

#[test]
fn test_repeat_unkeyed_updates_by_position() {
    let (mut r, container) = setup();
    let list = |items: Vec<&'static str>| {
        html!("<ol>", "</ol>"; repeat_unkeyed(items, |s, _| html!("<li>", "</li>"; *s)))
    };
    r.render(list(vec!["a", "b"]), container).unwrap();
    let before = r.host().find_all(container, "li");
    r.render(list(vec!["b", "a"]), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<ol><li>b</li><li>a</li></ol>");
    assert_eq!(r.host().find_all(container, "li"), before);
}

#[test]
fn test_async_replace_commits_latest_value_on_flush() {
    let (mut r, container) = setup();
    let producer = Producer::new();
    r.render(html!("<p>", "</p>"; async_replace(&producer)), container)
        .unwrap();
    assert_eq!(r.host().rendered_html(container), "<p></p>");
    assert_eq!(r.flush().unwrap(), 0);

    producer.push("one");
    producer.push("two");
    assert_eq!(r.flush().unwrap(), 1);
    assert_eq!(r.host().rendered_html(container), "<p>two</p>");
    assert_eq!(r.flush().unwrap(), 0);
}

#[test]
fn test_async_replace_ignores_replaced_producer() {
    let (mut r, container) = setup();
    let view = |producer: &Producer| html!("<p>", "</p>"; async_replace(producer));
    let a = Producer::new();
    let b = Producer::new();

    r.render(view(&a), container).unwrap();
    a.push("a1");
    r.flush().unwrap();
    assert_eq!(r.host().rendered_html(container), "<p>a1</p>");

    r.render(view(&b), container).unwrap();
    a.push("a2");
    assert_eq!(r.flush().unwrap(), 0);
    assert_eq!(r.host().rendered_html(container), "<p>a1</p>");

    b.push("b1");
    assert_eq!(r.flush().unwrap(), 1);
    assert_eq!(r.host().rendered_html(container), "<p>b1</p>");
}

#[test]
fn test_async_replace_mapper_sees_index() {
    let (mut r, container) = setup();
    let producer = Producer::new();
    let mapped = async_replace_with(&producer, |value, index| {
        Value::from(format!("{}:{}", index, value.to_text()))
    });
    r.render(html!("<p>", "</p>"; mapped), container).unwrap();

    producer.push("x");
    r.flush().unwrap();
    assert_eq!(r.host().rendered_html(container), "<p>0:x</p>");
    producer.push("y");
    r.flush().unwrap();
    assert_eq!(r.host().rendered_html(container), "<p>1:y</p>");
}

#[test]
fn test_async_replace_in_interpolated_attribute_keeps_other_slots() {
    let (mut r, container) = setup();
    let producer = Producer::new();
    let view = |suffix: &str| html!("<p title=\"x", "y", "\"></p>"; async_replace(&producer), suffix);

    r.render(view("-"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<p title=\"xy-\"></p>");

    producer.push("V");
    assert_eq!(r.flush().unwrap(), 1);
    assert_eq!(r.host().rendered_html(container), "<p title=\"xVy-\"></p>");

    r.render(view("+"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<p title=\"xVy+\"></p>");
}

#[test]
fn test_disconnected_tree_defers_async_values() {
    let (mut r, container) = setup();
    let producer = Producer::new();
    let root = r
        .render(html!("<p>", "</p>"; async_replace(&producer)), container)
        .unwrap();

    r.set_connected(root, false).unwrap();
    producer.push("hidden");
    producer.push("latest");
    assert_eq!(r.flush().unwrap(), 0);
    assert_eq!(r.host().rendered_html(container), "<p></p>");

    r.set_connected(root, true).unwrap();
    assert_eq!(r.flush().unwrap(), 1);
    assert_eq!(r.host().rendered_html(container), "<p>latest</p>");
    assert_eq!(r.flush().unwrap(), 0);
}

#[test]
fn test_async_replace_released_with_its_part() {
    let (mut r, container) = setup();
    let producer = Producer::new();
    let view = |value: Value| html!("<p>", "</p>"; value);
    r.render(view(async_replace(&producer).into()), container).unwrap();
    r.render(view("static".into()), container).unwrap();

    producer.push("late");
    assert_eq!(r.flush().unwrap(), 0);
    assert_eq!(r.host().rendered_html(container), "<p>static</p>");
}

#[test]
fn test_guard_skips_render_when_deps_unchanged() {
    let (mut r, container) = setup();
    let calls = Rc::new(Cell::new(0));
    let view = |dep: i32, calls: Rc<Cell<i32>>| {
        html!("<p>", "</p>"; guard(vec![Value::from(dep), Value::from("x")], move || {
            calls.set(calls.get() + 1);
            format!("dep {}", dep)
        }))
    };

    r.render(view(1, calls.clone()), container).unwrap();
    r.render(view(1, calls.clone()), container).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(r.host().rendered_html(container), "<p>dep 1</p>");

    r.render(view(2, calls.clone()), container).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(r.host().rendered_html(container), "<p>dep 2</p>");
}

#[test]
fn test_live_resets_drifted_property() {
    let (mut r, container) = setup();
    let view = |value: &str, checked: bool| {
        html!("<input .value=", " ?checked=", ">"; live(value), live(checked))
    };
    r.render(view("a", false), container).unwrap();
    let input = r.host().find_element(container, "input").unwrap();

    r.host_mut().set_property(input, "value", &Value::from("typed"));
    r.host_mut().set_attribute(input, "checked", "");
    r.render(view("a", false), container).unwrap();
    assert_eq!(
        r.host().get_property(input, "value").map(|v| v.to_text()),
        Some("a".to_string())
    );
    assert_eq!(r.host().get_attribute(input, "checked"), None);

    // In sync with the host: nothing is written
    let mutations = r.host().mutation_count();
    r.render(view("a", false), container).unwrap();
    assert_eq!(r.host().mutation_count(), mutations);
}

#[test]
fn test_live_attribute_binding() {
    let (mut r, container) = setup();
    let view = |value: &str| html!("<div title=", "></div>"; live(value));
    r.render(view("t"), container).unwrap();
    let div = r.host().find_element(container, "div").unwrap();
    r.host_mut().set_attribute(div, "title", "edited");
    r.render(view("t"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<div title=\"t\"></div>");
}

#[test]
fn test_class_map_toggles_classes_and_keeps_static_ones() {
    let (mut r, container) = setup();
    let view = |a: bool, b: bool| html!("<div class=\"card ", "\"></div>"; class_map([("a", a), ("b", b)]));

    r.render(view(true, false), container).unwrap();
    let div = r.host().find_element(container, "div").unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("card  a "));

    r.render(view(false, true), container).unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("card b"));

    r.render(view(false, false), container).unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("card"));
}

#[test]
fn test_class_map_never_repeats_static_classes() {
    let (mut r, container) = setup();
    let view = |s: bool, a: bool| html!("<div class=\"s ", "\"></div>"; class_map([("s", s), ("a", a)]));

    r.render(view(true, true), container).unwrap();
    let div = r.host().find_element(container, "div").unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("s  a "));

    r.render(view(false, false), container).unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("s"));

    r.render(view(true, true), container).unwrap();
    assert_eq!(r.host().get_attribute(div, "class").as_deref(), Some("s a"));
}

#[test]
fn test_keyed_recreates_content_on_key_change() {
    let (mut r, container) = setup();
    let view = |key: &str| html!("<div>", "</div>"; keyed(key, html!("<input>")));

    r.render(view("alice"), container).unwrap();
    let first = r.host().find_element(container, "input").unwrap();
    r.render(view("alice"), container).unwrap();
    assert_eq!(r.host().find_element(container, "input"), Some(first));

    r.render(view("bob"), container).unwrap();
    let second = r.host().find_element(container, "input").unwrap();
    assert_ne!(second, first);
    assert_eq!(r.host().rendered_html(container), "<div><input></div>");
}

#[test]
fn test_element_ref_follows_connection() {
    let (mut r, container) = setup();
    let target = ElementRef::new();
    let view = |target: &ElementRef| html!("<section><input ", "></section>"; element_ref(target));

    let root = r.render(view(&target), container).unwrap();
    let input = r.host().find_element(container, "input");
    assert!(input.is_some());
    assert_eq!(target.get(), input);

    r.set_connected(root, false).unwrap();
    assert_eq!(target.get(), None);
    r.set_connected(root, true).unwrap();
    assert_eq!(target.get(), input);

    r.render("gone", container).unwrap();
    assert_eq!(target.get(), None);
}

#[test]
fn test_element_ref_moves_to_new_target() {
    let (mut r, container) = setup();
    let view = |target: &ElementRef| html!("<input ", ">"; element_ref(target));
    let first = ElementRef::new();
    let second = ElementRef::new();

    r.render(view(&first), container).unwrap();
    r.render(view(&second), container).unwrap();
    assert_eq!(first.get(), None);
    assert_eq!(second.get(), r.host().find_element(container, "input"));
}

#[test]
fn test_unsafe_html_renders_markup_and_reuses_template() {
    let (mut r, container) = setup();
    let view = |markup: &str| html!("<div>", "</div>"; unsafe_html(markup));

    r.render(view("<b>x</b><i>y</i>"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<div><b>x</b><i>y</i></div>");
    let b = r.host().find_element(container, "b");

    r.render(view("<b>x</b><i>y</i>"), container).unwrap();
    assert_eq!(r.host().find_element(container, "b"), b);

    r.render(view("<em>z</em>"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<div><em>z</em></div>");

    r.render(html!("<div>", "</div>"; unsafe_html(Value::Nothing)), container)
        .unwrap();
    assert_eq!(r.host().rendered_html(container), "<div></div>");
}

#[test]
fn test_unsafe_svg_parses_in_svg_context() {
    let (mut r, container) = setup();
    r.render(
        html!("<svg>", "</svg>"; unsafe_svg("<linearGradient></linearGradient>")),
        container,
    )
    .unwrap();
    assert_eq!(
        r.host().rendered_html(container),
        "<svg><linearGradient></linearGradient></svg>"
    );
}

#[test]
fn test_switching_directive_kinds_in_one_slot() {
    let (mut r, container) = setup();
    let view = |value: Value| html!("<p>", "</p>"; value);

    r.render(view(guard(1, || "guarded").into()), container).unwrap();
    r.render(view(unsafe_html("<i>raw</i>").into()), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<p><i>raw</i></p>");
    r.render(view(keyed(1, "plain").into()), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<p>plain</p>");
}
