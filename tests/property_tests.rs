//! Property-based tests: generated values survive writing and reading, values
//! that cannot survive are refused by the writer, and arbitrary input never
//! panics the reader.

use ccsds_ndm::approx::ApproxEq;
use ccsds_ndm::odm::oem::{EphemerisState, OemData, OemMetadata};
use ccsds_ndm::time::TimeSystem;
use ccsds_ndm::{
    from_str, from_str_any, to_string_with_options, Aem, Epoch, Error, GeneratorOptions, Header,
    Message, Oem, Opm, Segment,
};
use proptest::prelude::*;

const OPM: &str = include_str!("fixtures/opm.kvn");
const AEM: &str = include_str!("fixtures/aem.kvn");

fn options(xml: bool) -> GeneratorOptions {
    if xml {
        GeneratorOptions::xml()
    } else {
        GeneratorOptions::kvn()
    }
}

fn is_parameter_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

fn epoch(hour: u32, minute: u32, millis: u32) -> Epoch {
    Epoch::parse(&format!("2020-03-14T{:02}:{:02}:00.{:03}", hour, minute, millis)).unwrap()
}

fn oem(states: &[[f64; 6]], hour: u32, millis: u32) -> Message<Oem> {
    let mut metadata = OemMetadata::default();
    metadata.common.object_name = Some("SAT".to_string());
    metadata.common.object_id = Some("2020-001A".to_string());
    metadata.common.center_name = Some("EARTH".to_string());
    metadata.common.ref_frame = Some("EME2000".to_string());
    metadata.common.time_system = Some(TimeSystem::Utc);
    metadata.start_time = Some(epoch(hour, 0, millis));
    metadata.stop_time = Some(epoch(hour, states.len() as u32, millis));

    let states = states
        .iter()
        .enumerate()
        .map(|(i, s)| EphemerisState {
            epoch: epoch(hour, i as u32, millis),
            position: [s[0], s[1], s[2]],
            velocity: [s[3], s[4], s[5]],
            acceleration: None,
        })
        .collect();

    let header = Header {
        creation_date: Some(epoch(0, 0, 0)),
        originator: Some("PROPTEST".to_string()),
        ..Header::default()
    };
    Message {
        header,
        segments: vec![Segment {
            metadata,
            data: OemData {
                states,
                ..OemData::default()
            },
        }],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_oem_states_round_trip(
        states in prop::collection::vec(prop::array::uniform6(-1.0e9f64..1.0e9), 1..20),
        hour in 0u32..24,
        millis in 0u32..1000,
        xml in any::<bool>(),
        units in any::<bool>(),
    ) {
        let message = oem(&states, hour, millis);
        let options = options(xml).with_units_column(if units { 50 } else { 0 });

        let written = to_string_with_options(&message, &options).unwrap();
        let parsed = from_str::<Oem>(&written).unwrap();
        prop_assert!(parsed.approx_eq(&message), "round trip changed the message:\n{}", written);
    }

    #[test]
    fn prop_attitude_states_must_match_layout(
        values in prop::collection::vec(-1.0f64..1.0, 0..10),
        xml in any::<bool>(),
    ) {
        let mut aem = from_str::<Aem>(AEM).unwrap();
        aem.segments[0].data.states[1].values = values.clone();

        match to_string_with_options(&aem, &options(xml)) {
            Ok(written) => {
                prop_assert_eq!(values.len(), 4);
                prop_assert!(from_str::<Aem>(&written).unwrap().approx_eq(&aem));
            }
            Err(Error::CountMismatch { keyword, declared, found, .. }) => {
                prop_assert_eq!(keyword, "ATTITUDE_TYPE");
                prop_assert_eq!(declared, 4);
                prop_assert_eq!(found, values.len());
            }
            Err(other) => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn prop_user_defined_names_read_back_or_are_refused(
        name in "[ -~]{0,12}",
        value in "[A-Za-z0-9]{1,10}",
        xml in any::<bool>(),
    ) {
        let mut opm = from_str::<Opm>(OPM).unwrap();
        let user = opm.segments[0].data.user_defined.get_or_insert_with(Default::default);
        user.parameters.insert(name.clone(), value);

        match to_string_with_options(&opm, &options(xml)) {
            Ok(written) => {
                prop_assert!(is_parameter_name(&name), "{:?} was written", name);
                let parsed = from_str::<Opm>(&written).unwrap();
                prop_assert!(parsed.approx_eq(&opm));
                let again = to_string_with_options(&parsed, &options(!xml)).unwrap();
                prop_assert!(from_str::<Opm>(&again).unwrap().approx_eq(&opm));
            }
            Err(Error::Unwritable { keyword, .. }) => {
                prop_assert!(!is_parameter_name(&name));
                prop_assert_eq!(keyword, format!("USER_DEFINED_{}", name));
            }
            Err(other) => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn prop_bracketed_names_survive_kvn(name in "[A-Z0-9]{1,6}( [A-Z0-9\\[\\]]{1,6}){0,3}") {
        let mut opm = from_str::<Opm>(OPM).unwrap();
        opm.segments[0].metadata.common.object_name = Some(name.clone());
        for options in [GeneratorOptions::kvn(), GeneratorOptions::kvn().with_units_column(50)] {
            let written = to_string_with_options(&opm, &options).unwrap();
            let parsed = from_str::<Opm>(&written).unwrap();
            prop_assert_eq!(parsed.segments[0].metadata.common.object_name.as_deref(), Some(name.as_str()));
        }
    }

    #[test]
    fn prop_arbitrary_text_never_panics(text in "\\PC{0,200}") {
        let _ = from_str_any(&text);
    }

    #[test]
    fn prop_arbitrary_units_never_panic(unit in "[A-Za-z%*/0-9+-]{0,16}") {
        let text = OPM.replacen("[km]", &format!("[{}]", unit), 1);
        let _ = from_str::<Opm>(&text);
    }

    #[test]
    fn prop_arbitrary_kvn_lines_never_panic(
        lines in prop::collection::vec("[A-Z_]{1,12} = [ -~]{0,30}", 0..20),
    ) {
        let text = format!("CCSDS_OPM_VERS = 3.0\n{}\n", lines.join("\n"));
        let _ = from_str_any(&text);
    }
}
