//! E3: range mask expands into per-interval copies laid out contiguously.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use rtc_model::{DataSource, Direction, ElementRange, ElementType, Function, RangeMask, SignalDescriptor};
use rtc_broker::{plan, PlannerInput};

use support::{TestDataSource, TestFunction};

#[test]
fn range_mask_lays_out_selected_elements_contiguously() {
    let data_source = TestDataSource::new("D", 1, &[40], &["s"]);
    let values: Vec<u8> = (10u32..20).flat_map(|v| v.to_le_bytes()).collect();
    data_source.write_buffer(0, 0, &values);

    let mask = RangeMask::new(vec![ElementRange::new(0, 0), ElementRange::new(2, 5), ElementRange::new(9, 9)], 10).unwrap();
    let signal = SignalDescriptor {
        name: "s".to_string(),
        alias: None,
        data_source: "D".to_string(),
        direction: Direction::Input,
        element_type: ElementType::U32,
        dimensionality: rtc_model::Dimensionality::Vector,
        element_count: 10,
        samples_per_cycle: 1,
        frequency_hz: None,
        default_value: None,
        range_mask: Some(mask),
        pre_trigger_buffers: None,
        post_trigger_buffers: None,
    };
    let function = TestFunction::new("F", vec![signal], 1, &[24]);

    let functions: Vec<Arc<dyn Function>> = vec![function.clone()];
    let thread_of = HashMap::new();
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D".to_string(), data_source.clone());

    let plans = plan(PlannerInput { functions: &functions, thread_of: &thread_of, data_sources: &data_sources }).unwrap();
    plans[0].input_brokers[0].execute(0).unwrap();

    let expected: Vec<u8> = [10u32, 12, 13, 14, 15, 19].iter().flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(function.read_signal(0, 0, 24), expected);
}
