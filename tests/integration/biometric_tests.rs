//! Biometric engine against the simulated sensor: enrollment stages,
//! store isolation on failure, search and delete.

use fpaccess::app::ports::SensorCode;
use fpaccess::biometric::{BiometricEngine, EnrollStage, EnrollTiming, VerifyOutcome};
use fpaccess::config::SystemConfig;
use fpaccess::error::BiometricError;
use fpaccess::registry::UserId;

use crate::mock_hw::{SimSensor, StepTimer};

fn engine(sensor: &SimSensor) -> (BiometricEngine<SimSensor, StepTimer>, StepTimer) {
    let timer = StepTimer::new();
    let timing = EnrollTiming::from(&SystemConfig::default());
    (BiometricEngine::new(sensor.clone(), timer.clone(), timing), timer)
}

fn uid(raw: u8) -> UserId {
    UserId::new(raw).unwrap()
}

#[test]
fn begin_reports_sensor_parameters() {
    let sensor = SimSensor::new();
    let (mut e, _) = engine(&sensor);
    let params = e.begin().unwrap();
    assert_eq!(params.capacity, 127);
    assert_eq!(params.packet_len, 128);
}

#[test]
fn begin_fails_when_sensor_is_absent() {
    let sensor = SimSensor::new();
    sensor.0.borrow_mut().absent = true;
    let (mut e, _) = engine(&sensor);
    assert_eq!(e.begin(), Err(BiometricError::Sensor(SensorCode::Link)));
}

#[test]
fn enrollment_waits_for_finger_then_stores_template() {
    let sensor = SimSensor::new();
    sensor.script(&[None, None, Some(42), Some(42), None, None, Some(42)]);
    let (mut e, timer) = engine(&sensor);

    let mut stages = Vec::new();
    e.enroll(uid(9), |s| stages.push(s)).unwrap();

    assert_eq!(stages.first(), Some(&EnrollStage::FirstImage));
    assert_eq!(stages.last(), Some(&EnrollStage::Store));
    assert_eq!(sensor.library().get(&9), Some(&42));
    // The removal pause always elapses.
    assert!(timer.now_ms() >= 2_000);
}

#[test]
fn inconsistent_samples_leave_store_untouched() {
    let sensor = SimSensor::new().with_template(1, 100);
    sensor.script(&[Some(7), None, Some(8)]);
    let (mut e, _) = engine(&sensor);

    assert_eq!(e.enroll(uid(2), |_| {}), Err(BiometricError::Mismatch));
    assert_eq!(sensor.library().len(), 1);
    assert_eq!(sensor.0.borrow().stores, 0);
}

#[test]
fn store_failure_is_reported_as_store_error() {
    let sensor = SimSensor::new();
    sensor.script_enrollment(5);
    sensor.0.borrow_mut().store_fault = Some(SensorCode::FlashError);
    let (mut e, _) = engine(&sensor);

    assert_eq!(
        e.enroll(uid(2), |_| {}),
        Err(BiometricError::Store(SensorCode::FlashError))
    );
    assert!(sensor.library().is_empty());
}

#[test]
fn missing_second_sample_times_out_at_second_image() {
    let sensor = SimSensor::new();
    sensor.script(&[Some(3), None]);
    let (mut e, timer) = engine(&sensor);

    assert_eq!(
        e.enroll(uid(2), |_| {}),
        Err(BiometricError::Timeout(EnrollStage::SecondImage))
    );
    let c = SystemConfig::default();
    assert!(timer.now_ms() >= u64::from(c.removal_delay_ms + c.capture_timeout_ms));
    assert!(sensor.library().is_empty());
}

#[test]
fn verify_on_empty_store_is_no_match() {
    let sensor = SimSensor::new();
    sensor.script(&[Some(11)]);
    let (mut e, _) = engine(&sensor);
    assert_eq!(e.verify(), Ok(VerifyOutcome::NoMatch));
    assert_eq!(sensor.searches(), 1);
}

#[test]
fn verify_without_finger_is_distinct_from_no_match() {
    let sensor = SimSensor::new().with_template(3, 11);
    let (mut e, _) = engine(&sensor);
    let err = e.verify().unwrap_err();
    assert!(err.is_no_finger());
    assert_eq!(sensor.searches(), 0);
}

#[test]
fn verify_finds_enrolled_finger() {
    let sensor = SimSensor::new().with_template(3, 11).with_template(40, 12);
    sensor.script(&[Some(12)]);
    let (mut e, _) = engine(&sensor);
    assert_eq!(
        e.verify(),
        Ok(VerifyOutcome::Match {
            id: uid(40),
            confidence: 87
        })
    );
}

#[test]
fn capture_fault_during_verify_is_not_no_finger() {
    let sensor = SimSensor::new();
    sensor.0.borrow_mut().capture_fault = Some(SensorCode::ImageFail);
    let (mut e, _) = engine(&sensor);
    let err = e.verify().unwrap_err();
    assert_eq!(err, BiometricError::Capture(SensorCode::ImageFail));
    assert!(!err.is_no_finger());
}

#[test]
fn delete_requires_occupied_slot() {
    let sensor = SimSensor::new().with_template(6, 1);
    let (mut e, _) = engine(&sensor);
    assert_eq!(e.delete_template(uid(7)), Err(BiometricError::EmptySlot));
    assert_eq!(e.delete_template(uid(6)), Ok(()));
    assert!(sensor.library().is_empty());
    assert_eq!(e.template_count(), Ok(0));
}

#[test]
fn sensor_info_combines_parameters_and_count() {
    let sensor = SimSensor::new().with_template(1, 1).with_template(2, 2);
    let (mut e, _) = engine(&sensor);
    let info = e.sensor_info().unwrap();
    assert_eq!(info.templates_stored, 2);
    assert_eq!(info.parameters.security_level, 3);
}
