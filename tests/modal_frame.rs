use approx::assert_relative_eq;

use eigenframe::{
    datatypes::{HingeEnds, SectionProperties, SupportKind, Vertex},
    input, post_processor,
    validator::ModelStatus,
    EditError, EigenframeError, Model,
};

fn section() -> SectionProperties {
    SectionProperties {
        youngs_modulus: 2.1e11,
        area: 5.38e-3,
        inertia: 8.36e-5,
        density: 7850.0,
    }
}

/// Straight beam on the x axis with one node per coordinate
fn beam(xs: &[f64], hinges: &[HingeEnds]) -> Model {
    let mut model = Model::default();
    for (i, x) in xs.iter().enumerate() {
        model.create_node(*x, 0.0, i + 1).unwrap();
    }
    model.assign_dofs().unwrap();
    for (i, h) in hinges.iter().enumerate() {
        model.create_element(i + 1, i + 1, i + 2, section(), *h).unwrap();
    }
    model
}

#[test]
fn single_element_scenario() {
    let mut model = Model::default();
    assert_eq!(model.status(), ModelStatus::NoNodes);

    model.create_node(0.0, 0.0, 1).unwrap();
    model.create_node(1.0, 0.0, 2).unwrap();
    assert_eq!(model.status(), ModelStatus::NoElements);

    model.assign_dofs().unwrap();
    model
        .create_element(1, 1, 2, section(), HingeEnds::none())
        .unwrap();
    model.assemble();
    assert_eq!(model.status(), ModelStatus::NoSupports);

    model.create_support(1, 0).unwrap();
    assert_eq!(model.status(), ModelStatus::Ready);

    let solution = model.solve().unwrap();
    assert_eq!(solution.eigen.eigenvalues.len(), 3);
    assert_eq!(solution.eigen.eigenvectors.nrows(), 6);
    assert!(solution.eigen.eigenvalues.windows(2).all(|w| w[0] <= w[1]));

    // clamped end does not move in any mode
    for mode in 0..3 {
        let shape = solution.eigen.mode_shape(mode).unwrap();
        assert_eq!(&shape.as_slice()[..3], &[0.0, 0.0, 0.0]);
    }

    let props = section();
    let axial = 3.0 * props.youngs_modulus / (props.density * 1.0);
    assert!(solution
        .eigen
        .eigenvalues
        .iter()
        .any(|l| (l - axial).abs() < 1e-6 * axial));
}

#[test]
fn hinge_at_free_end_leaves_frequencies_unchanged() {
    let xs = [0.0, 1.5, 3.0];

    let mut plain = beam(&xs, &[HingeEnds::none(), HingeEnds::none()]);
    plain.create_support(1, 0).unwrap();
    let reference = plain.solve().unwrap().eigen.eigenvalues.clone();

    let mut hinged = beam(&xs, &[HingeEnds::none(), HingeEnds::at_b()]);
    assert_eq!(hinged.status(), ModelStatus::DanglingNodes);
    hinged.assemble();
    assert_eq!(hinged.nodes().len(), 3);
    hinged.create_support(1, 0).unwrap();

    let solution = hinged.solve().unwrap();
    assert_eq!(solution.eigen.eigenvalues.len(), reference.len());
    for (a, b) in solution.eigen.eigenvalues.iter().zip(&reference) {
        assert_relative_eq!(*a, *b, max_relative = 1e-8);
    }
}

#[test]
fn released_node_keeps_constraints_aligned() {
    let xs = [0.0, 2.0, 4.0];

    // one release at node 2
    let mut single = beam(&xs, &[HingeEnds::none(), HingeEnds::at_a()]);
    single.assemble();
    single.create_support(1, 0).unwrap();
    single.create_support(3, 0).unwrap();
    let reference = single.solve().unwrap().eigen.eigenvalues.clone();

    // both elements released at node 2, leaving the original node unused
    let mut double = beam(&xs, &[HingeEnds::at_b(), HingeEnds::at_a()]);
    double.assemble();
    assert!(double.nodes().get(2).is_none());
    assert_eq!(double.elements().assembly().unwrap().dangling_dofs, vec![6]);
    double.create_support(1, 0).unwrap();
    double.create_support(3, 0).unwrap();
    assert_eq!(double.status(), ModelStatus::Ready);

    let solution = double.solve().unwrap();
    assert_eq!(solution.eigen.eigenvectors.nrows(), 11);
    assert_eq!(solution.eigen.eigenvectors.row(5).amax(), 0.0);
    for (a, b) in solution.eigen.eigenvalues.iter().zip(&reference) {
        assert_relative_eq!(*a, *b, max_relative = 1e-8);
    }
}

#[test]
fn portal_frame_from_script() {
    let script = r#"{
        "settings": { "shape_points": 5, "shape_fraction": 0.2 },
        "nodes": [
            { "id": 1, "x": 0.0, "y": 0.0 },
            { "id": 2, "x": 0.0, "y": 3.0 },
            { "id": 3, "x": 4.0, "y": 3.0 },
            { "id": 4, "x": 4.0, "y": 0.0 }
        ],
        "elements": [
            { "id": 1, "nodes": [1, 2], "E": 2.1e11, "A": 5.38e-3, "I": 8.36e-5, "rho": 7850 },
            { "id": 2, "nodes": [2, 3], "E": 2.1e11, "A": 5.38e-3, "I": 8.36e-5, "rho": 7850 },
            { "id": 3, "nodes": [3, 4], "E": 2.1e11, "A": 5.38e-3, "I": 8.36e-5, "rho": 7850 }
        ],
        "supports": [ { "node": 1, "type": 0 }, { "node": 4, "type": 1 } ]
    }"#;
    let mut model = input::build_model(&input::parse_script(script).unwrap()).unwrap();
    assert_eq!(model.status(), ModelStatus::Ready);

    model.solve().unwrap();
    let frequencies = model.frequencies_hz().unwrap();
    assert_eq!(frequencies.len(), 12 - 5);
    assert!(frequencies.iter().all(|f| *f > 0.0));

    model.change_mode(2).unwrap();
    assert_eq!(model.current_mode(), Some(2));
    let curves = model.current_shape().unwrap();
    assert_eq!(curves.len(), 3);
    assert!(curves.iter().all(|c| c.points.len() == 5));

    // the clamped base stays put in the drawn shape
    let base = curves[0].points[0];
    assert_relative_eq!(base.x, 0.0);
    assert_relative_eq!(base.y, 0.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mode3.csv");
    post_processor::csv_output(curves, 2, frequencies[2], path.to_str().unwrap()).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("mode,element,point,x,y"));
    assert_eq!(lines.count(), 15);
}

#[test]
fn change_scale_is_relative_to_default() {
    let mut model = beam(&[0.0, 1.0, 2.0], &[HingeEnds::none(), HingeEnds::none()]);
    model.create_support(1, 0).unwrap();
    model.solve().unwrap();
    let base = model.solution().unwrap().shapes.scale();

    model.change_scale(2.0).unwrap();
    model.change_scale(2.0).unwrap();
    assert_relative_eq!(model.solution().unwrap().shapes.scale(), 2.0 * base);

    model.change_scale(1.0).unwrap();
    assert_relative_eq!(model.solution().unwrap().shapes.scale(), base);
}

#[test]
fn ids_are_not_reused() {
    let mut model = beam(&[0.0, 1.0, 2.0], &[HingeEnds::none()]);
    assert_eq!(model.next_node_id(), 4);

    model.delete_node(3).unwrap();
    assert_eq!(model.next_node_id(), 4);
    model.delete_node(1).unwrap();
    assert_eq!(model.next_node_id(), 4);
    assert!(model.elements().is_empty());
}

#[test]
fn unsupported_model_does_not_solve() {
    let mut model = beam(&[0.0, 1.0], &[HingeEnds::none()]);
    assert!(matches!(
        model.solve(),
        Err(EigenframeError::NotReady(ModelStatus::NoSupports))
    ));

    model.create_support(1, 2).unwrap();
    assert_eq!(model.status(), ModelStatus::Singular);
}

#[test]
fn support_follows_cleaned_up_hinge_origin() {
    let xs = [0.0, 1.5, 3.0];

    let mut plain = beam(&xs, &[HingeEnds::none(), HingeEnds::none()]);
    plain.create_support(1, 1).unwrap();
    plain.create_support(3, 0).unwrap();
    let reference = plain.solve().unwrap().eigen.eigenvalues.clone();

    // a release at a pinned end changes nothing physically
    let mut hinged = beam(&xs, &[HingeEnds::at_a(), HingeEnds::none()]);
    hinged.create_support(1, 1).unwrap();
    hinged.create_support(3, 0).unwrap();
    hinged.assemble();

    assert!(hinged.nodes().get(1).is_none());
    assert_eq!(hinged.supports().len(), 2);
    let moved = hinged.supports().get(4).unwrap();
    assert_eq!(moved.kind, SupportKind::Pinned);
    assert_eq!(hinged.status(), ModelStatus::Ready);

    let solution = hinged.solve().unwrap();
    assert_eq!(solution.eigen.eigenvalues.len(), reference.len());
    for (a, b) in solution.eigen.eigenvalues.iter().zip(&reference) {
        assert_relative_eq!(*a, *b, max_relative = 1e-8);
    }
}

#[test]
fn deleting_a_hinged_node_removes_the_whole_point() {
    let mut model = beam(&[0.0, 2.0, 4.0], &[HingeEnds::none(), HingeEnds::at_a()]);
    model.create_support(4, 1).unwrap();
    assert_eq!(model.nodes().len(), 4);

    model.delete_node(2).unwrap();
    assert_eq!(model.nodes().len(), 2);
    assert!(model.nodes().get(4).is_none());
    assert!(model.elements().is_empty());
    assert!(model.supports().is_empty());

    assert_eq!(model.create_node(2.0, 0.0, 9), Ok(9));
}

#[test]
fn deleting_the_hinged_element_restores_its_node() {
    let mut model = beam(&[0.0, 2.0], &[HingeEnds::at_b()]);
    model.create_support(3, 1).unwrap();

    model.delete_element(1).unwrap();
    assert!(model.nodes().get(3).is_none());
    assert!(model.nodes().iter().all(|n| !n.hinge && !n.dangling));
    assert!(model.nodes().dangling_candidates().is_empty());
    // the support returns to the node it stood on
    assert_eq!(model.supports().get(2).map(|s| s.kind), Some(SupportKind::Pinned));

    model.assign_dofs().unwrap();
    assert_eq!(
        model.node_coordinates(),
        vec![(1, Vertex { x: 0.0, y: 0.0 }), (2, Vertex { x: 2.0, y: 0.0 })]
    );
    model
        .create_element(2, 1, 2, section(), HingeEnds::none())
        .unwrap();
    assert_eq!(
        model.create_element(3, 1, 3, section(), HingeEnds::none()),
        Err(EditError::UnknownNode(3))
    );
}
