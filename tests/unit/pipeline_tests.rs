// Pipeline parser unit tests

use rstest::rstest;

use edgepix::engine::Operation;
use edgepix::pipeline::{parse_pipeline, OperationDescriptor, Pipeline};

fn names(pipeline: &Pipeline) -> Vec<&str> {
    pipeline.iter().map(|step| step.name.as_str()).collect()
}

#[rstest]
#[case("resize!10,10", 1)]
#[case("resize!10,10|fliph|grayscale", 3)]
#[case("|resize!10,10|", 1)]
#[case("fliph||flipv", 2)]
#[case("|||", 0)]
#[case("", 0)]
fn test_segment_count_ignores_empty_segments(#[case] action: &str, #[case] expected: usize) {
    assert_eq!(Pipeline::parse(action).len(), expected);
    assert_eq!(parse_pipeline(action).len(), expected);
}

#[test]
fn test_order_is_preserved() {
    let pipeline = Pipeline::parse("crop!0,0,5,5|rotate!90|watermark!https://img.test/w.png,1,2");
    assert_eq!(names(&pipeline), vec!["crop", "rotate", "watermark"]);
    assert_eq!(
        pipeline.steps()[2].raw_params,
        vec!["https://img.test/w.png", "1", "2"]
    );
}

#[rstest]
#[case("fliph", "fliph", &[])]
#[case("fliph!", "fliph", &[])]
#[case("resize!a,b,c", "resize", &["a", "b", "c"])]
#[case("blend!https://x.test/a.png,multiply", "blend", &["https://x.test/a.png", "multiply"])]
#[case("adjust_brightness!-20", "adjust_brightness", &["-20"])]
#[case("name!a!b", "name", &["a!b"])]
fn test_descriptor_parsing(#[case] segment: &str, #[case] name: &str, #[case] params: &[&str]) {
    let descriptor = OperationDescriptor::parse(segment);
    assert_eq!(descriptor.name, name);
    assert_eq!(descriptor.raw_params, params);
}

#[test]
fn test_parsing_is_purely_syntactic() {
    // Unknown names survive parsing; dispatch rejects them
    let pipeline = Pipeline::parse("sparkle!1|!x");
    assert_eq!(names(&pipeline), vec!["sparkle", ""]);
    assert!(Operation::from_name("sparkle").is_none());
    assert!(Operation::from_name("").is_none());
}

#[test]
fn test_every_known_operation_name_parses() {
    for name in Operation::names() {
        let pipeline = Pipeline::parse(&format!("{}!1", name));
        let step = &pipeline.steps()[0];
        assert_eq!(Operation::from_name(&step.name), Operation::from_name(name));
    }
}
