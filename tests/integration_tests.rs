use ccsds_ndm::approx::close;
use ccsds_ndm::odm::ocm::TrajType;
use ccsds_ndm::tdm::ObservationType;
use ccsds_ndm::time::TimeTag;
use ccsds_ndm::units::{DEG, REV_DAY};
use ccsds_ndm::{
    from_reader, from_str, from_str_any, from_str_named, Aem, Apm, Epoch, Error, Ndm, Ocm, Oem,
    Omm, Opm, Tdm,
};
use pretty_assertions::assert_eq;

const OPM: &str = include_str!("fixtures/opm.kvn");
const OMM: &str = include_str!("fixtures/omm.kvn");
const OEM: &str = include_str!("fixtures/oem.kvn");
const OCM: &str = include_str!("fixtures/ocm.kvn");
const APM: &str = include_str!("fixtures/apm.kvn");
const AEM: &str = include_str!("fixtures/aem.kvn");
const TDM: &str = include_str!("fixtures/tdm.kvn");

fn epoch(text: &str) -> Epoch {
    Epoch::parse(text).unwrap()
}

#[test]
fn test_opm_kvn() {
    let opm = from_str::<Opm>(OPM).unwrap();
    assert_eq!(opm.header.format_version, 3.0);
    assert_eq!(opm.header.comments, vec!["Generated by GSOC, R. Kiehling"]);
    assert_eq!(opm.header.message_id.as_deref(), Some("OPM 201113719185"));

    let segment = &opm.segments[0];
    assert_eq!(segment.metadata.comments, vec!["Geocentric, Cartesian, Earth Fixed"]);
    assert_eq!(segment.metadata.common.object_name.as_deref(), Some("GODZILLA 5"));

    let state = &segment.data.state_vector;
    assert_eq!(state.comments, vec!["State Vector"]);
    assert_eq!(state.epoch, Some(epoch("2022-12-18T14:28:15.1172")));
    assert!(close(state.x.unwrap(), 6_503_514.0));
    assert!(close(state.z_dot.unwrap(), -4_191.076));

    let kepler = segment.data.keplerian_elements.as_ref().unwrap();
    assert!(close(kepler.inclination.unwrap(), DEG.to_si(139.8781)));
    assert!(close(kepler.gm.unwrap(), 398_600.4415e9));

    let spacecraft = segment.data.spacecraft_parameters.as_ref().unwrap();
    assert_eq!(spacecraft.comments, vec!["Spacecraft parameters"]);
    assert_eq!(spacecraft.mass, Some(3000.0));

    let covariance = segment.data.covariance.as_ref().unwrap();
    assert_eq!(covariance.comments, vec!["Position/Velocity Covariance Matrix"]);
    assert_eq!(covariance.cov_ref_frame.as_deref(), Some("RTN"));
    assert!(covariance.terms.iter().all(Option::is_some));

    let maneuvers = &segment.data.maneuvers;
    assert_eq!(maneuvers.len(), 2);
    assert_eq!(maneuvers[0].comments, vec!["2 planned maneuvers"]);
    assert!(maneuvers[1].comments.is_empty());
    assert_eq!(maneuvers[1].ref_frame.as_deref(), Some("RSW"));

    let user = segment.data.user_defined.as_ref().unwrap();
    assert_eq!(user.parameters.get("EARTH_MODEL").map(String::as_str), Some("WGS-84"));
}

#[test]
fn test_omm_kvn() {
    let omm = from_str::<Omm>(OMM).unwrap();
    assert_eq!(omm.header.creation_date, Some(epoch("2007-03-06T16:00:00")));

    let data = &omm.segments[0].data;
    assert!(close(data.mean_elements.mean_motion.unwrap(), REV_DAY.to_si(1.00273272)));
    assert_eq!(data.mean_elements.semi_major_axis, None);

    let tle = data.tle_parameters.as_ref().unwrap();
    assert_eq!(tle.element_set_no, Some(925));
    assert_eq!(tle.norad_cat_id, Some(23581));
    assert_eq!(tle.classification_type.as_deref(), Some("U"));
}

#[test]
fn test_oem_kvn() {
    let oem = from_str::<Oem>(OEM).unwrap();
    assert_eq!(oem.segments.len(), 2);

    let first = &oem.segments[0];
    assert_eq!(first.metadata.interpolation_degree, Some(7));
    assert_eq!(first.data.states.len(), 3);
    assert!(first.data.states.iter().all(|s| s.acceleration.is_none()));
    assert!(first.data.covariances.is_empty());

    let second = &oem.segments[1];
    assert_eq!(second.data.states.len(), 2);
    let acceleration = second.data.states[0].acceleration.unwrap();
    assert!(close(acceleration[2], 3.0));

    let covariance = &second.data.covariances[0];
    assert_eq!(covariance.epoch, Some(epoch("1996-12-28T21:29:07.267")));
    assert_eq!(covariance.cov_ref_frame.as_deref(), Some("EME2000"));
    assert!(close(covariance.terms[0].unwrap(), 3.3313494e-4 * 1.0e6));
    assert!(covariance.terms.iter().all(Option::is_some));
}

#[test]
fn test_ocm_kvn() {
    let ocm = from_str::<Ocm>(OCM).unwrap();
    assert_eq!(ocm.segments.len(), 1);

    let segment = &ocm.segments[0];
    assert_eq!(
        segment.metadata.comments,
        vec!["Orbit covariance and maneuvers of GODZILLA 5"]
    );
    assert_eq!(segment.metadata.taimutc_at_tzero, Some(36.0));

    let trajectory = &segment.data.trajectories[0];
    assert_eq!(trajectory.traj_type, Some(TrajType::Cartpv));
    assert_eq!(trajectory.lines.len(), 3);
    assert_eq!(trajectory.lines[1].time, TimeTag::Relative(60.0));
    assert!(close(trajectory.lines[1].values[0], 2_783_400.0));

    let physical = segment.data.physical_properties.as_ref().unwrap();
    assert_eq!(physical.wet_mass, Some(1913.0));
    assert!(close(physical.drag_uncertainty.unwrap(), 0.1));

    assert_eq!(segment.data.covariances[0].lines[0].values.len(), 6);

    let maneuver = &segment.data.maneuvers[0];
    assert_eq!(maneuver.man_composition, vec!["TIME_ABSOLUTE", "DV_X", "DV_Y", "DV_Z"]);
    assert_eq!(
        maneuver.lines[0].time,
        TimeTag::Absolute(epoch("1998-12-18T14:28:15.1172"))
    );
    assert!(close(maneuver.lines[0].values[2], -2.4));

    let od = segment.data.orbit_determination.as_ref().unwrap();
    assert_eq!(od.sensors_used, vec!["DSS-25", "DSS-45"]);
    assert_eq!(od.sensor_noise_stddev, vec![vec![0.5, 1.5]]);
    assert!(close(od.days_since_first_obs.unwrap(), 2.5 * 86_400.0));

    let user = segment.data.user_defined.as_ref().unwrap();
    assert_eq!(user.parameters.get("CONSOLE_POC").map(String::as_str), Some("MAXWELL SMART"));
}

#[test]
fn test_apm_kvn() {
    let apm = from_str::<Apm>(APM).unwrap();
    let segment = &apm.segments[0];
    assert_eq!(segment.metadata.comments, vec!["GEOCENTRIC, TRUE EQUATOR"]);

    let quaternion = &segment.data.quaternion_state;
    assert_eq!(quaternion.q[3], Some(0.25678));
    assert_eq!(quaternion.q_dot, [None; 4]);

    let euler = segment.data.euler_angle_state.as_ref().unwrap();
    assert_eq!(euler.comments, vec!["Euler angles"]);
    assert_eq!(euler.euler_rot_seq.as_deref(), Some("312"));
    assert!(close(euler.angles[1].unwrap(), DEG.to_si(139.7527)));

    let inertia = segment.data.inertia.as_ref().unwrap();
    assert_eq!(inertia.moments[3], Some(-135.9));

    assert_eq!(segment.data.maneuvers.len(), 2);
    assert_eq!(segment.data.maneuvers[1].duration, Some(12.0));
}

#[test]
fn test_aem_kvn() {
    let aem = from_str::<Aem>(AEM).unwrap();
    assert_eq!(aem.segments.len(), 2);

    let quaternions = &aem.segments[0].data.states;
    assert_eq!(quaternions.len(), 3);
    assert_eq!(quaternions[0].values, vec![0.56748, 0.03146, 0.45689, 0.68427]);

    let angles = &aem.segments[1].data.states;
    assert_eq!(angles.len(), 2);
    assert!(close(angles[0].values[0], DEG.to_si(-26.78)));
}

#[test]
fn test_tdm_kvn() {
    let tdm = from_str::<Tdm>(TDM).unwrap();
    assert_eq!(tdm.segments.len(), 2);

    let first = &tdm.segments[0];
    assert_eq!(first.metadata.participants, vec!["DSS-25", "yyyy-nnnA"]);
    assert_eq!(first.metadata.path.as_deref(), Some("1,2,1"));
    assert_eq!(first.data.comments, vec!["Range residuals"]);

    let observations = &first.data.observations;
    assert_eq!(observations.len(), 4);
    assert_eq!(observations[1].kind, ObservationType::Range);
    assert_eq!(observations[1].epoch, epoch("2005-06-08T17:41:00"));
    assert_eq!(observations[1].value, 40_000.0);

    assert_eq!(tdm.segments[1].data.observations[0].kind, ObservationType::Angle1);
}

#[test]
fn test_from_str_any_identifies_every_type() {
    let cases = [
        (OPM, "OPM"),
        (OMM, "OMM"),
        (OEM, "OEM"),
        (OCM, "OCM"),
        (APM, "APM"),
        (AEM, "AEM"),
        (TDM, "TDM"),
    ];
    for (text, name) in cases {
        assert_eq!(from_str_any(text).unwrap().name(), name);
    }
    assert!(matches!(from_str_any(TDM).unwrap(), Ndm::Tdm(_)));
}

#[test]
fn test_from_reader() {
    let oem = from_reader::<_, Oem>(OEM.as_bytes()).unwrap();
    assert_eq!(oem, from_str::<Oem>(OEM).unwrap());
}

#[test]
fn test_wrong_message_type() {
    let err = from_str_named::<Oem>(OPM, "opm.kvn").unwrap_err();
    match err {
        Error::UnexpectedKeyword {
            ref source_name,
            line,
            ref keyword,
            ..
        } => {
            assert_eq!(source_name, "opm.kvn");
            assert_eq!(line, 1);
            assert_eq!(keyword, "CCSDS_OPM_VERS");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("CCSDS_OEM_VERS"));
}

#[test]
fn test_message_id_rejected_in_attitude_messages() {
    let text = APM.replace("ORIGINATOR = GSFC", "ORIGINATOR = GSFC\nMESSAGE_ID = APM-1");
    let err = from_str::<Apm>(&text).unwrap_err();
    assert!(matches!(err, Error::KeywordNotAllowed { line: 4, .. }));
}

#[test]
fn test_message_id_rejected_before_version_3() {
    let with_id = OEM.replace("ORIGINATOR = NASA/JPL", "ORIGINATOR = NASA/JPL\nMESSAGE_ID = OEM-1");
    assert!(from_str::<Oem>(&with_id).is_ok());

    let text = with_id.replace("CCSDS_OEM_VERS = 3.0", "CCSDS_OEM_VERS = 2.0");
    match from_str::<Oem>(&text).unwrap_err() {
        Error::KeywordNotAllowed { keyword, version, .. } => {
            assert_eq!(keyword, "MESSAGE_ID");
            assert_eq!(version, 2.0);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_comment_after_fields() {
    let text = OPM.replace("Y = 1239.647000 [km]", "COMMENT too late\nY = 1239.647000 [km]");
    let err = from_str::<Opm>(&text).unwrap_err();
    assert!(matches!(err, Error::CommentNotAllowed { line: 17, .. }));
}

#[test]
fn test_trailing_comment() {
    let err = from_str::<Opm>(&format!("{}COMMENT dangling\n", OPM)).unwrap_err();
    assert!(matches!(err, Error::CommentNotAllowed { .. }));
}

#[test]
fn test_declared_count_mismatch() {
    let text = OCM.replace("NUMBER_SENSORS_USED = 2", "NUMBER_SENSORS_USED = 3");
    match from_str::<Ocm>(&text).unwrap_err() {
        Error::CountMismatch {
            keyword,
            declared,
            found,
            ..
        } => {
            assert_eq!(keyword, "NUMBER_SENSORS_USED");
            assert_eq!((declared, found), (3, 2));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_index_gap() {
    let text = OCM.replace("SENSORS_USED_2 = DSS-45", "SENSORS_USED_3 = DSS-45");
    assert!(matches!(
        from_str::<Ocm>(&text).unwrap_err(),
        Error::InvalidIndex { expected: 2, found: 3, .. }
    ));
}

#[test]
fn test_missing_mandatory_keyword() {
    let text = OMM.replace("OBJECT_ID = 1995-025A\n", "");
    match from_str::<Omm>(&text).unwrap_err() {
        Error::MissingKeyword { keyword, .. } => assert_eq!(keyword, "OBJECT_ID"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_incompatible_unit() {
    let text = OPM.replace("X = 6503.514000 [km]", "X = 6503.514000 [s]");
    assert!(matches!(
        from_str::<Opm>(&text).unwrap_err(),
        Error::IncompatibleUnit { line: 16, .. }
    ));
}

#[test]
fn test_overflowing_unit_exponents() {
    for unit in ["N**100", "1/m**-128", "km**200"] {
        let text = OPM.replace("X = 6503.514000 [km]", &format!("X = 6503.514000 [{}]", unit));
        match from_str::<Opm>(&text).unwrap_err() {
            Error::IncompatibleUnit { line, unit: found, .. } => {
                assert_eq!(line, 16);
                assert_eq!(found, unit);
            }
            other => panic!("unexpected {:?} for [{}]", other, unit),
        }
    }
}

#[test]
fn test_non_finite_numbers_are_invalid() {
    for value in ["NaN", "inf", "-Infinity"] {
        let text = OPM.replace("X = 6503.514000 [km]", &format!("X = {} [km]", value));
        assert!(matches!(
            from_str::<Opm>(&text).unwrap_err(),
            Error::InvalidValue { line: 16, .. }
        ));
    }
}

#[test]
fn test_incomplete_xml_state_vector() {
    let oem = from_str::<Oem>(OEM).unwrap();
    let xml = ccsds_ndm::to_string_with_options(&oem, &ccsds_ndm::GeneratorOptions::xml()).unwrap();
    let start = xml.find("<Y_DOT>").unwrap();
    let end = start + xml[start..].find('\n').unwrap() + 1;
    let truncated = format!("{}{}", &xml[..start], &xml[end..]);
    match from_str::<Oem>(&truncated).unwrap_err() {
        Error::InvalidValue { keyword, expected, .. } => {
            assert_eq!(keyword, "stateVector");
            assert!(expected.contains("Y_DOT"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unclosed_section() {
    let end = OEM.find("META_STOP").unwrap();
    let err = from_str::<Oem>(&OEM[..end]).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof { .. }));
}

#[test]
fn test_tdm_path_beyond_participants() {
    let text = TDM.replace("PATH = 1,2,1", "PATH = 1,3,1");
    assert!(matches!(
        from_str::<Tdm>(&text).unwrap_err(),
        Error::CountMismatch { declared: 2, found: 3, .. }
    ));
}

#[test]
fn test_json_export() {
    let opm = from_str::<Opm>(OPM).unwrap();
    let json = serde_json::to_value(&opm).unwrap();
    assert_eq!(json["header"]["originator"], "GSOC");
    assert_eq!(json["segments"][0]["metadata"]["common"]["object_id"], "1998-999A");
    assert_eq!(json["segments"][0]["data"]["maneuvers"].as_array().map(Vec::len), Some(2));

    let back: ccsds_ndm::Message<Opm> = serde_json::from_value(json).unwrap();
    assert_eq!(back, opm);
}
