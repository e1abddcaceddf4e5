//! Built-in procurement template eligibility questionnaire
//!
//! Decides whether a purchase can go through the standard purchasing
//! template. Each gate that rules the template out carries the guidance the
//! requester should follow instead.

use super::{DefinitionError, StepDefinition, WorkflowDefinition};

pub const AGREEMENT_TYPE: &str = "agreement_type";
pub const ESTIMATED_VALUE: &str = "estimated_value";
pub const CONSTRUCTION_WORK: &str = "construction_work";
pub const SUPPLIER_REGISTERED: &str = "supplier_registered";
pub const PERSONAL_DATA: &str = "personal_data";
pub const SOLE_SOURCE: &str = "sole_source";
pub const CONTRACT_TERM: &str = "contract_term";
pub const BUDGET_APPROVED: &str = "budget_approved";

const NAME: &str = "procurement-template-eligibility";
const VERSION: &str = "2";

fn steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(
            AGREEMENT_TYPE,
            "Is this agreement a procurement (buying goods or services) or a grant?",
        )
        .allow(["Procurement", "Grant"])
        .terminal("Grant", "Templates cannot be used for Grants."),
        StepDefinition::new(
            ESTIMATED_VALUE,
            "What is the estimated total value of the purchase: under $50,000, between $50,000 and $250,000, or over $250,000?",
        )
        .allow(["UNDER_50K", "50K_TO_250K", "OVER_250K"])
        .instruction(
            "50K_TO_250K",
            "Purchases between $50,000 and $250,000 need three written quotes attached to the template.",
        )
        .terminal(
            "OVER_250K",
            "Purchases over $250,000 require a formal tender. Contact Procurement Services to start a tender instead of using the template.",
        ),
        StepDefinition::new(
            CONSTRUCTION_WORK,
            "Does the purchase include any construction, renovation or installation work on a building or site?",
        )
        .allow(["YES", "NO"])
        .terminal(
            "YES",
            "Construction work is managed by Facilities Capital Projects. Submit a capital works request instead of using the template.",
        ),
        StepDefinition::new(
            SUPPLIER_REGISTERED,
            "Is the supplier already registered in the supplier portal?",
        )
        .allow(["YES", "NO"])
        .instruction(
            "NO",
            "Ask the supplier to complete portal registration before the purchase order is raised.",
        ),
        StepDefinition::new(
            PERSONAL_DATA,
            "Will the supplier store, process or have access to personal or confidential data?",
        )
        .allow(["YES", "NO"])
        .terminal(
            "YES",
            "Suppliers handling personal or confidential data need a data protection assessment. Contact the Privacy Office before proceeding; the template cannot be used.",
        ),
        StepDefinition::new(
            SOLE_SOURCE,
            "Is this a sole-source purchase where only one supplier can provide the goods or services?",
        )
        .allow(["YES", "NO"])
        .instruction(
            "YES",
            "Attach a sole-source justification signed by your budget holder.",
        ),
        StepDefinition::new(
            CONTRACT_TERM,
            "Will the agreement run for longer than three years, including any extension options?",
        )
        .allow(["YES", "NO"])
        .terminal(
            "YES",
            "Agreements longer than three years must be reviewed by Legal Services. The template cannot be used.",
        ),
        StepDefinition::new(
            BUDGET_APPROVED,
            "Has the budget holder approved the funding for this purchase?",
        )
        .allow(["YES", "NO"])
        .terminal(
            "NO",
            "Obtain written funding approval from your budget holder, then start the template again.",
        ),
    ]
}

fn inference_rules() -> [String; 2] {
    [
        format!(
            "Simple commodity purchases (office supplies, stationery, standard IT equipment, off-the-shelf software licences) involve no construction work: answer {CONSTRUCTION_WORK} NO automatically when the user describes one."
        ),
        format!(
            "Only answer {ESTIMATED_VALUE} when the user states or clearly implies an amount; never guess a value band."
        ),
    ]
}

/// The built-in questionnaire, validated
pub fn definition() -> Result<WorkflowDefinition, DefinitionError> {
    Ok(WorkflowDefinition::new(NAME, VERSION, steps())?.with_inference_rules(inference_rules()))
}
