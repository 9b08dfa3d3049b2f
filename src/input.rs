//! Model scripts: a JSON description of a frame replayed against a [`Model`].

use json::JsonValue;

use crate::{
    datatypes::{HingeEnds, ModelSettings, SectionProperties},
    error::EigenframeError,
    model::Model,
};

/// Reads and parses the model script at `input_file`
fn load_input_file(input_file: &str) -> Result<JsonValue, EigenframeError> {
    let file_string = match std::fs::read_to_string(input_file) {
        Ok(f) => f,
        Err(_err) => {
            return Err(EigenframeError::Input(format!(
                "Unable to open input file {}",
                input_file
            )))
        }
    };

    parse_script(&file_string)
}

/// Parses a model script and checks its top-level layout
pub fn parse_script(contents: &str) -> Result<JsonValue, EigenframeError> {
    let script = match json::parse(contents) {
        Ok(f) => f,
        Err(err) => {
            return Err(EigenframeError::Input(format!(
                "Error in input file json: {err}"
            )))
        }
    };

    for section in ["nodes", "elements", "supports"] {
        if !script.has_key(section) {
            return Err(EigenframeError::Input(format!(
                "Input json missing {section} field"
            )));
        }
        if !script[section].is_array() {
            return Err(EigenframeError::Input(format!(
                "Input json field {section} must be an array"
            )));
        }
    }

    Ok(script)
}

/// Reads the optional `settings` object over the defaults
///
/// # Arguments
/// * `script`: The model script as a JsonValue object
pub fn parse_settings(script: &JsonValue) -> Result<ModelSettings, EigenframeError> {
    let mut settings = ModelSettings::default();
    let raw = &script["settings"];
    if raw.is_null() {
        return Ok(settings);
    }
    if !raw.is_object() {
        return Err(EigenframeError::Input(
            "Input json settings field must be an object".to_owned(),
        ));
    }

    if raw.has_key("coordinate_tolerance") {
        settings.coordinate_tolerance = positive_f64(raw, "coordinate_tolerance")?;
    }
    if raw.has_key("shape_fraction") {
        settings.shape_fraction = positive_f64(raw, "shape_fraction")?;
    }
    if raw.has_key("eigenvalue_tolerance") {
        settings.eigenvalue_tolerance = positive_f64(raw, "eigenvalue_tolerance")?;
    }
    if raw.has_key("shape_points") {
        settings.shape_points = match raw["shape_points"].as_usize() {
            Some(p) if p >= 2 => p,
            _ => {
                return Err(EigenframeError::Input(
                    "Input json shape_points must be an integer of at least 2".to_owned(),
                ))
            }
        };
    }

    Ok(settings)
}

fn positive_f64(object: &JsonValue, key: &str) -> Result<f64, EigenframeError> {
    match object[key].as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(EigenframeError::Input(format!(
            "Input json {key} must be a positive number"
        ))),
    }
}

fn required_f64(entry: &JsonValue, key: &str, section: &str, index: usize) -> Result<f64, EigenframeError> {
    entry[key].as_f64().ok_or_else(|| {
        EigenframeError::Input(format!("Entry {index} of {section} missing numeric field {key}"))
    })
}

fn required_usize(
    entry: &JsonValue,
    key: &str,
    section: &str,
    index: usize,
) -> Result<usize, EigenframeError> {
    entry[key].as_usize().ok_or_else(|| {
        EigenframeError::Input(format!("Entry {index} of {section} missing integer field {key}"))
    })
}

/// Reads the `[a, b]` node pair of an element entry
fn parse_element_nodes(entry: &JsonValue, index: usize) -> Result<(usize, usize), EigenframeError> {
    let pair = &entry["nodes"];
    match (pair.len(), pair[0].as_usize(), pair[1].as_usize()) {
        (2, Some(a), Some(b)) if pair.is_array() => Ok((a, b)),
        _ => Err(EigenframeError::Input(format!(
            "Entry {index} of elements must list exactly two node ids"
        ))),
    }
}

/// Reads the optional `[at_a, at_b]` hinge flags of an element entry
fn parse_hinges(entry: &JsonValue, index: usize) -> Result<HingeEnds, EigenframeError> {
    let hinges = &entry["hinges"];
    if hinges.is_null() {
        return Ok(HingeEnds::none());
    }

    match (hinges.len(), hinges[0].as_bool(), hinges[1].as_bool()) {
        (2, Some(at_a), Some(at_b)) if hinges.is_array() => Ok(HingeEnds { at_a, at_b }),
        _ => Err(EigenframeError::Input(format!(
            "Entry {index} of elements has malformed hinges, expected [bool, bool]"
        ))),
    }
}

/// Builds a model from a parsed script
///
/// Nodes are created first, then DOFs are assigned, elements created and the
/// model assembled before supports are attached. Edits the model rejects are
/// logged and skipped; malformed entries abort the load.
pub fn build_model(script: &JsonValue) -> Result<Model, EigenframeError> {
    let settings = parse_settings(script)?;
    let mut model = Model::new(settings);

    for (i, entry) in script["nodes"].members().enumerate() {
        let id = required_usize(entry, "id", "nodes", i)?;
        let x = required_f64(entry, "x", "nodes", i)?;
        let y = required_f64(entry, "y", "nodes", i)?;

        if let Err(err) = model.create_node(x, y, id) {
            log::warn!("skipping node {}: {}", id, err);
        }
    }

    if let Err(err) = model.assign_dofs() {
        log::warn!("unable to assign dofs: {}", err);
    }

    for (i, entry) in script["elements"].members().enumerate() {
        let id = required_usize(entry, "id", "elements", i)?;
        let (a, b) = parse_element_nodes(entry, i)?;
        let properties = SectionProperties {
            youngs_modulus: required_f64(entry, "E", "elements", i)?,
            area: required_f64(entry, "A", "elements", i)?,
            inertia: required_f64(entry, "I", "elements", i)?,
            density: required_f64(entry, "rho", "elements", i)?,
        };
        let hinges = parse_hinges(entry, i)?;

        if let Err(err) = model.create_element(id, a, b, properties, hinges) {
            log::warn!("skipping element {}: {}", id, err);
        }
    }

    model.assemble();

    for (i, entry) in script["supports"].members().enumerate() {
        let node = required_usize(entry, "node", "supports", i)?;
        let code = match entry["type"].as_u8() {
            Some(c) => c,
            None => {
                return Err(EigenframeError::Input(format!(
                    "Entry {i} of supports missing integer field type"
                )))
            }
        };

        if let Err(err) = model.create_support(node, code) {
            log::warn!("skipping support at node {}: {}", node, err);
        }
    }

    log::info!(
        "loaded {} nodes, {} elements and {} supports; status {:?}",
        model.nodes().len(),
        model.elements().len(),
        model.supports().len(),
        model.status()
    );

    Ok(model)
}

/// Loads the model script at `input_file` into a new model
pub fn run(input_file: &str) -> Result<Model, EigenframeError> {
    let script = load_input_file(input_file)?;
    build_model(&script)
}
