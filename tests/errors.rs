use weft::{
    class_map, element_ref, html, live, repeat_unkeyed, unsafe_html, ElementRef, EngineConfig,
    Listener, MemoryHost, NodeId, Renderer, ResultKind, TemplateError, TemplateResult,
    TemplateStrings, Value,
};

fn setup(config: EngineConfig) -> (Renderer, NodeId) {
    let mut host = MemoryHost::new();
    let container = host.create_element("div");
    (Renderer::new(host, &config.with_marker_seed(11)), container)
}

fn render(value: impl Into<Value>) -> Result<String, TemplateError> {
    let (mut r, container) = setup(EngineConfig::new());
    r.render(value, container)?;
    Ok(r.host().rendered_html(container))
}

#[test]
fn test_dynamic_tag_names_are_rejected() {
    let err = render(html!("<", "></div>"; "div")).unwrap_err();
    assert!(matches!(err, TemplateError::DynamicTagName { slot: 0 }));

    let err = render(html!("<p></p></", ">"; "p")).unwrap_err();
    assert!(matches!(err, TemplateError::DynamicTagName { slot: 0 }));
}

#[test]
fn test_duplicate_bound_attribute() {
    let err = render(html!("<p a=", " a=", "></p>"; 1, 2)).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::DuplicateAttributeBinding { expected: 2, .. }
    ));
}

#[test]
fn test_binding_inside_template_element() {
    let err = render(html!("<template><p>", "</p></template>"; "x")).unwrap_err();
    assert!(matches!(err, TemplateError::BindingInTemplateElement));
}

#[test]
fn test_event_bindings_take_exactly_one_expression() {
    let listener = Listener::new(|_| {});
    let err = render(html!(
        "<button @click=\"a", "b", "\"></button><p>", "</p>";
        listener.clone(), "Y", "Z"
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::InterpolatedEventBinding { ref element, ref name }
            if element == "button" && name == "click"
    ));

    let err = render(html!("<a @click=\"", "", "\"></a>"; listener.clone(), listener)).unwrap_err();
    assert!(matches!(err, TemplateError::InterpolatedEventBinding { .. }));
}

#[test]
fn test_value_count_mismatch() {
    let strings = TemplateStrings::intern(["<p>", "</p>"]);
    let result = TemplateResult::new(strings, ResultKind::Html, Vec::new());
    let err = render(result).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::ValueCountMismatch { slots: 1, values: 0 }
    ));
}

#[test]
fn test_untrusted_strings() {
    let strings = TemplateStrings::untrusted(["<p>", "</p>"]);
    let result = TemplateResult::new(strings, ResultKind::Html, vec![Value::from("x")]);
    assert!(matches!(render(result), Err(TemplateError::UntrustedStrings)));
}

#[test]
fn test_directives_in_wrong_positions() {
    let err = render(html!("<p title=", "></p>"; repeat_unkeyed([1, 2], |n, _| *n))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition { directive: "repeat", .. }
    ));

    let err = render(html!("<p>", "</p>"; live("x"))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition { directive: "live", .. }
    ));

    let err = render(html!("<p title=\"a", "b\"></p>"; live("x"))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition { directive: "live", .. }
    ));

    let err = render(html!("<p id=", "></p>"; class_map([("a", true)]))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition {
            directive: "class_map",
            ..
        }
    ));

    let err = render(html!("<p>", "</p>"; element_ref(&ElementRef::new()))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition {
            directive: "element_ref",
            ..
        }
    ));

    let err = render(html!("<p title=", "></p>"; unsafe_html("<b></b>"))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnsupportedDirectivePosition {
            directive: "unsafe_html",
            ..
        }
    ));
}

#[test]
fn test_unsafe_html_requires_a_string() {
    let err = render(html!("<p>", "</p>"; unsafe_html(5))).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::NonStringValue {
            directive: "unsafe_html"
        }
    ));
}

#[test]
fn test_rendering_a_node_into_itself() {
    let (mut r, container) = setup(EngineConfig::new());
    let err = r.render(container, container).unwrap_err();
    assert!(matches!(err, TemplateError::NodeIntoItself));
}

#[test]
fn test_raw_text_bindings_fail_while_sanitizing() {
    let (mut r, container) = setup(EngineConfig::new().with_sanitize(true));
    let err = r
        .render(html!("<script>let x = ", ";</script>"; "1"), container)
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::ForbiddenRawTextBinding { ref element } if element == "script"
    ));

    // Ordinary text is still committed through the pass-through sanitizer
    let (mut r, container) = setup(EngineConfig::new().with_sanitize(true));
    r.render(html!("<p>", "</p>"; "ok"), container).unwrap();
    assert_eq!(r.host().rendered_html(container), "<p>ok</p>");
}

#[test]
fn test_report_points_at_the_template() {
    let strings = TemplateStrings::intern(["<", "></div>"]);
    let err = TemplateError::DynamicTagName { slot: 0 };
    let report = err.report(&strings, "card.html");
    assert!(report.contains("bindings in tag names are not supported"));
    assert!(report.contains("card.html"));
}
