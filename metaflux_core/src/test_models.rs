//! Small fermentation network shared by the unit tests
//!
//! Glucose is split into two pyruvate, which can go to acetyl-CoA through PDH (needs oxygen),
//! PFL (half the acetyl-CoA yield, secretes formate) or be reduced to lactate by LDH.
//! Acetyl-CoA is drained by biomass or secreted as acetate. Aerobic growth on 10 glucose is
//! 2.0 with 20 CO2 secreted, anaerobic growth is 1.0 with 20 formate secreted.
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::io::gpr_parse::parse_gpr;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::MetaboliteBuilder;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::ReactionBuilder;

const METABOLITES: [(&str, &str); 15] = [
    ("glc__D_e", "C6H12O6"),
    ("glc__D_c", "C6H12O6"),
    ("pyr_c", "C3H3O3"),
    ("coa_c", "C21H32N7O16P3S"),
    ("accoa_c", "C23H34N7O17P3S"),
    ("o2_e", "O2"),
    ("o2_c", "O2"),
    ("co2_c", "CO2"),
    ("co2_e", "CO2"),
    ("for_c", "CHO2"),
    ("for_e", "CHO2"),
    ("lac__L_c", "C3H5O3"),
    ("lac__L_e", "C3H5O3"),
    ("ac_c", "C2H3O2"),
    ("ac_e", "C2H3O2"),
];

type ReactionRow = (
    &'static str,
    &'static str,
    &'static [(&'static str, f64)],
    f64,
    f64,
    &'static str,
);

const REACTIONS: [ReactionRow; 18] = [
    ("EX_glc__D_e", "D-Glucose exchange", &[("glc__D_e", -1.)], -10., 1000., ""),
    ("GLCpts", "D-glucose transport via PEP:Pyr PTS", &[("glc__D_e", -1.), ("glc__D_c", 1.)], 0., 1000., "b_pts"),
    ("GLYC", "Glycolysis (lumped)", &[("glc__D_c", -1.), ("pyr_c", 2.)], 0., 1000., "b_gly1 and b_gly2"),
    (
        "PDH",
        "Pyruvate dehydrogenase",
        &[("pyr_c", -1.), ("coa_c", -1.), ("o2_c", -0.5), ("accoa_c", 1.), ("co2_c", 1.)],
        0.,
        1000.,
        "b_pdh1 or b_pdh2",
    ),
    (
        "PFL",
        "Pyruvate formate lyase (lumped)",
        &[("pyr_c", -1.), ("coa_c", -0.5), ("accoa_c", 0.5), ("for_c", 1.)],
        0.,
        1000.,
        "b_pfl",
    ),
    ("LDH", "L-lactate dehydrogenase", &[("pyr_c", -1.), ("lac__L_c", 1.)], 0., 1000., "b_ldh"),
    ("LACt", "L-lactate transport", &[("lac__L_c", -1.), ("lac__L_e", 1.)], 0., 1000., ""),
    ("EX_lac__L_e", "L-Lactate exchange", &[("lac__L_e", -1.)], 0., 1000., ""),
    (
        "PTA",
        "Phosphotransacetylase (lumped)",
        &[("accoa_c", -1.), ("ac_c", 1.), ("coa_c", 1.)],
        0.,
        1000.,
        "b_pta",
    ),
    ("ACt", "Acetate transport", &[("ac_c", -1.), ("ac_e", 1.)], 0., 1000., ""),
    ("EX_ac_e", "Acetate exchange", &[("ac_e", -1.)], 0., 1000., ""),
    ("FORt", "Formate transport", &[("for_c", -1.), ("for_e", 1.)], 0., 1000., ""),
    ("EX_for_e", "Formate exchange", &[("for_e", -1.)], 0., 1000., ""),
    ("CO2t", "CO2 transport", &[("co2_c", -1.), ("co2_e", 1.)], 0., 1000., ""),
    ("EX_co2_e", "CO2 exchange", &[("co2_e", -1.)], -1000., 1000., ""),
    ("O2t", "O2 transport", &[("o2_e", -1.), ("o2_c", 1.)], 0., 1000., ""),
    ("EX_o2_e", "O2 exchange", &[("o2_e", -1.)], -20., 1000., ""),
    ("BIOMASS", "Biomass objective function", &[("accoa_c", -10.), ("coa_c", 10.)], 0., 1000., ""),
];

const GENE_NAMES: [(&str, &str); 8] = [
    ("b_pts", "ptsG"),
    ("b_gly1", "pfkA"),
    ("b_gly2", "gapA"),
    ("b_pdh1", "aceE"),
    ("b_pdh2", "lpd"),
    ("b_pfl", "pflB"),
    ("b_ldh", "ldhA"),
    ("b_pta", "pta"),
];

/// Build the toy network described in the module docs
pub(crate) fn toy_model() -> Model {
    let mut model = Model::new_empty();
    model.id = Some("toy_fermenter".to_string());
    for (id, name) in GENE_NAMES {
        model.add_gene(Gene::new(id, Some(name)));
    }
    for (id, formula) in METABOLITES {
        model.add_metabolite(
            MetaboliteBuilder::default()
                .id(id.to_string())
                .formula(Some(formula.to_string()))
                .compartment(id.rsplit('_').next().map(|c| c.to_string()))
                .build()
                .unwrap(),
        );
    }
    for (id, name, stoichiometry, lb, ub, rule) in REACTIONS {
        let gpr = if rule.is_empty() {
            None
        } else {
            Some(parse_gpr(rule, &mut model.genes).unwrap())
        };
        let metabolites: IndexMap<String, f64> = stoichiometry
            .iter()
            .map(|(met, coef)| (met.to_string(), *coef))
            .collect();
        model.add_reaction(
            ReactionBuilder::default()
                .id(id.to_string())
                .name(Some(name.to_string()))
                .metabolites(metabolites)
                .lower_bound(lb)
                .upper_bound(ub)
                .gpr(gpr)
                .build()
                .unwrap(),
        );
    }
    model.objective.insert("BIOMASS".to_string(), 1.0);
    model
}

/// Path to the JSON copy of the toy network
pub(crate) fn toy_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("test_models")
        .join("toy_model.json")
}

/// Route `log` output of a test through the test harness, safe to call repeatedly
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
