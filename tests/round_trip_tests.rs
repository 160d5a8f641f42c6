//! Every fixture written in both syntaxes, with and without units, must read
//! back to the same message.

use ccsds_ndm::approx::ApproxEq;
use ccsds_ndm::{
    from_str, to_string_with_options, Aem, Apm, Error, GeneratorOptions, Message, MessageKind, Ocm,
    Oem, Omm, Opm, Syntax, Tdm,
};
use pretty_assertions::assert_eq;

const OPM: &str = include_str!("fixtures/opm.kvn");
const OMM: &str = include_str!("fixtures/omm.kvn");
const OEM: &str = include_str!("fixtures/oem.kvn");
const OCM: &str = include_str!("fixtures/ocm.kvn");
const APM: &str = include_str!("fixtures/apm.kvn");
const AEM: &str = include_str!("fixtures/aem.kvn");
const TDM: &str = include_str!("fixtures/tdm.kvn");

fn all_options() -> Vec<GeneratorOptions> {
    vec![
        GeneratorOptions::kvn(),
        GeneratorOptions::kvn().with_units_column(60),
        GeneratorOptions::xml(),
        GeneratorOptions::xml().with_units_column(60),
    ]
}

fn write_and_read<K: MessageKind>(message: &Message<K>, options: &GeneratorOptions) -> Message<K> {
    let written = to_string_with_options(message, options)
        .unwrap_or_else(|e| panic!("writing {} as {}: {}", K::NAME, options.syntax, e));
    from_str::<K>(&written)
        .unwrap_or_else(|e| panic!("reading {} written as {}: {}\n{}", K::NAME, options.syntax, e, written))
}

fn assert_round_trip<K: MessageKind>(text: &str) {
    let original = from_str::<K>(text).unwrap();
    for options in all_options() {
        let parsed = write_and_read(&original, &options);
        assert!(
            parsed.approx_eq(&original),
            "{} differs after a {} round trip (units column {})",
            K::NAME,
            options.syntax,
            options.units_column
        );
    }
}

/// KVN to XML to KVN keeps the message.
fn assert_cross_syntax<K: MessageKind>(text: &str) {
    let original = from_str::<K>(text).unwrap();
    let through_xml = write_and_read(&original, &GeneratorOptions::xml());
    let back = write_and_read(&through_xml, &GeneratorOptions::kvn());
    assert!(back.approx_eq(&original), "{} differs after KVN -> XML -> KVN", K::NAME);
}

#[test]
fn test_opm_round_trip() {
    assert_round_trip::<Opm>(OPM);
    assert_cross_syntax::<Opm>(OPM);
}

#[test]
fn test_omm_round_trip() {
    assert_round_trip::<Omm>(OMM);
    assert_cross_syntax::<Omm>(OMM);
}

#[test]
fn test_oem_round_trip() {
    assert_round_trip::<Oem>(OEM);
    assert_cross_syntax::<Oem>(OEM);
}

#[test]
fn test_ocm_round_trip() {
    assert_round_trip::<Ocm>(OCM);
    assert_cross_syntax::<Ocm>(OCM);
}

#[test]
fn test_apm_round_trip() {
    assert_round_trip::<Apm>(APM);
    assert_cross_syntax::<Apm>(APM);
}

#[test]
fn test_aem_round_trip() {
    assert_round_trip::<Aem>(AEM);
    assert_cross_syntax::<Aem>(AEM);
}

#[test]
fn test_tdm_round_trip() {
    assert_round_trip::<Tdm>(TDM);
    assert_cross_syntax::<Tdm>(TDM);
}

#[test]
fn test_units_column() {
    let opm = from_str::<Opm>(OPM).unwrap();

    let bare = to_string_with_options(&opm, &GeneratorOptions::kvn()).unwrap();
    assert!(!bare.contains('['));

    let with_units = to_string_with_options(&opm, &GeneratorOptions::kvn().with_units_column(40)).unwrap();
    let line = with_units.lines().find(|l| l.starts_with("X ")).unwrap();
    assert_eq!(line.find('['), Some(40));
    assert!(line.ends_with("[km]"));
}

#[test]
fn test_xml_output_detected_as_xml() {
    let tdm = from_str::<Tdm>(TDM).unwrap();
    let xml = to_string_with_options(&tdm, &GeneratorOptions::xml()).unwrap();
    assert_eq!(Syntax::detect(&xml), Syntax::Xml);
    assert!(xml.contains("id=\"CCSDS_TDM_VERS\""));
    assert!(xml.contains("version=\"2.0\""));
}

#[test]
fn test_written_kvn_is_stable() {
    let tdm = from_str::<Tdm>(TDM).unwrap();
    let first = to_string_with_options(&tdm, &GeneratorOptions::kvn()).unwrap();
    let second = to_string_with_options(&from_str::<Tdm>(&first).unwrap(), &GeneratorOptions::kvn()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_xml_user_defined_name_is_case_normalized() {
    let opm = from_str::<Opm>(OPM).unwrap();
    let xml = to_string_with_options(&opm, &GeneratorOptions::xml()).unwrap();
    assert!(xml.contains("parameter=\"EARTH_MODEL\""));

    let lower = from_str::<Opm>(&xml.replace("parameter=\"EARTH_MODEL\"", "parameter=\"earth_model\"")).unwrap();
    let user = lower.segments[0].data.user_defined.as_ref().unwrap();
    assert_eq!(user.parameters.keys().collect::<Vec<_>>(), vec!["EARTH_MODEL"]);
    assert!(lower.approx_eq(&opm));

    let back = write_and_read(&lower, &GeneratorOptions::kvn());
    assert!(back.approx_eq(&opm));
}

#[test]
fn test_unwritable_user_defined_name() {
    let mut opm = from_str::<Opm>(OPM).unwrap();
    let user = opm.segments[0].data.user_defined.as_mut().unwrap();
    user.parameters.insert("A B".to_string(), "x".to_string());
    for options in all_options() {
        match to_string_with_options(&opm, &options.with_output_name("out.opm")) {
            Err(Error::Unwritable { output_name, keyword, .. }) => {
                assert_eq!(output_name, "out.opm");
                assert_eq!(keyword, "USER_DEFINED_A B");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_bracketed_text_value_round_trip() {
    let mut opm = from_str::<Opm>(OPM).unwrap();
    opm.segments[0].metadata.common.object_name = Some("SAT [A]".to_string());
    opm.segments[0].metadata.common.center_name = Some("EARTH [km]".to_string());
    for options in all_options() {
        let parsed = write_and_read(&opm, &options);
        let common = &parsed.segments[0].metadata.common;
        assert_eq!(common.object_name.as_deref(), Some("SAT [A]"));
        assert_eq!(common.center_name.as_deref(), Some("EARTH [km]"));
        assert!(parsed.approx_eq(&opm));
    }
}

#[test]
fn test_short_attitude_state_is_refused() {
    let mut aem = from_str::<Aem>(AEM).unwrap();
    aem.segments[0].data.states[0].values = vec![1.0];
    for options in all_options() {
        assert!(matches!(
            to_string_with_options(&aem, &options),
            Err(Error::CountMismatch { declared: 4, found: 1, .. })
        ));
    }
    assert!(matches!(aem.validate("aem"), Err(Error::CountMismatch { .. })));
}
