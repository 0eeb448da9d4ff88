//! E1: single-thread direct copy.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use rtc_model::{DataSource, Direction, Function};
use rtc_broker::{plan, PlannerInput};

use support::{u32_signal, TestDataSource, TestFunction};

#[test]
fn input_memory_reads_the_value_written_to_the_data_source() {
    let data_source = TestDataSource::new("D", 1, &[4], &["s"]);
    data_source.write_buffer(0, 0, &0xDEADBEEFu32.to_le_bytes());

    let signal = u32_signal("s", "D", Direction::Input);
    let function = TestFunction::new("F", vec![signal], 1, &[4]);

    let functions: Vec<Arc<dyn Function>> = vec![function.clone()];
    let mut thread_of = HashMap::new();
    thread_of.insert("F".to_string(), "T".to_string());
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D".to_string(), data_source.clone());

    let plans = plan(PlannerInput { functions: &functions, thread_of: &thread_of, data_sources: &data_sources }).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].input_brokers.len(), 1);
    assert!(plans[0].output_brokers.is_empty());

    plans[0].input_brokers[0].execute(0).unwrap();

    assert_eq!(function.read_signal(0, 0, 4), 0xDEADBEEFu32.to_le_bytes());
}
