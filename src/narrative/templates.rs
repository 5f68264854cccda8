use std::collections::HashSet;

use crate::predictor::{LifecycleStage, PredictionResult};
use crate::signals::{RiskLevel, SignalKind};
use crate::simulation::{ParameterChanges, SimulationResult};

const MAX_RECOMMENDATIONS: usize = 8;

pub fn narrative_explanation(prediction: &PredictionResult) -> String {
    let mut narrative = format!(
        "The trend is currently in the {} phase with a {:.1}% decline probability. ",
        prediction.lifecycle_stage, prediction.decline_probability
    );

    narrative.push_str(match prediction.risk_level {
        RiskLevel::Critical => "This represents a critical risk level requiring immediate intervention. ",
        RiskLevel::High => "This indicates high risk and warrants urgent attention. ",
        RiskLevel::Medium => "This shows moderate risk that should be monitored closely. ",
        RiskLevel::Low => "The trend remains relatively healthy with manageable risk. ",
    });

    let factors = &prediction.contributing_factors;
    if let Some(top) = factors.first() {
        narrative.push_str(&format!("The primary decline driver is {}", top.factor.label()));
        match factors.get(1) {
            Some(second) => narrative.push_str(&format!(", followed by {}. ", second.factor.label())),
            None => narrative.push_str(". "),
        }
    }

    narrative.push_str(&format!(
        "Without intervention, the trend is estimated to collapse in {}.",
        prediction.days_to_collapse
    ));
    narrative
}

/// Up to eight distinct actions, most specific first.
pub fn strategy_recommendations(prediction: &PredictionResult) -> Vec<String> {
    let mut recommendations: Vec<&str> = Vec::new();

    if let Some(top) = prediction.contributing_factors.first() {
        let contribution = top.contribution;
        match top.factor {
            SignalKind::Engagement if contribution > 15.0 => recommendations.extend([
                "Launch interactive challenges or contests to boost engagement",
                "Increase posting frequency with high-quality, varied content",
                "Create user-generated content campaigns to drive participation",
            ]),
            SignalKind::Influencer if contribution > 10.0 => recommendations.extend([
                "Re-engage key influencers with exclusive partnership opportunities",
                "Identify and activate emerging micro-influencers in the space",
                "Create influencer incentive programs with performance rewards",
            ]),
            SignalKind::Sentiment if contribution > 10.0 => recommendations.extend([
                "Address negative sentiment through transparent communication",
                "Improve content quality based on user feedback",
                "Launch positive PR campaign highlighting success stories",
            ]),
            SignalKind::Saturation if contribution > 10.0 => recommendations.extend([
                "Introduce fresh variations and creative twists to combat fatigue",
                "Pivot to adjacent niches or sub-trends",
                "Create scarcity through limited-time or exclusive content",
            ]),
            _ => {}
        }
    }

    match prediction.lifecycle_stage {
        LifecycleStage::EarlyDecline => {
            recommendations.push("Implement retention strategies and loyalty programs immediately")
        }
        LifecycleStage::RapidCollapse => recommendations
            .push("Consider strategic pivot or controlled wind-down to preserve brand equity"),
        LifecycleStage::Peak => {
            recommendations.push("Prepare sustainability plan and diversification strategy")
        }
        _ => {}
    }

    if prediction.decline_probability > 50.0 {
        recommendations.extend([
            "Partner with major brands for co-branded revival campaign",
            "Create nostalgia-driven content to re-engage original audience",
        ]);
    }
    recommendations.push("Amplify top-performing content through paid promotion");

    let mut seen = HashSet::new();
    recommendations
        .into_iter()
        .filter(|item| seen.insert(*item))
        .take(MAX_RECOMMENDATIONS)
        .map(|item| item.to_string())
        .collect()
}

pub fn key_insights(prediction: &PredictionResult) -> Vec<String> {
    let probability = prediction.decline_probability;
    let mut insights = Vec::new();
    if probability > 70.0 {
        insights.push(format!("Critical decline risk detected at {:.1}%", probability));
    } else if probability > 40.0 {
        insights.push(format!("Elevated decline risk at {:.1}%", probability));
    }
    insights.push(format!("Trend is in {} phase", prediction.lifecycle_stage));
    insights.push(format!(
        "Estimated collapse timeline: {}",
        prediction.days_to_collapse
    ));
    insights
}

pub fn simulation_explanation(result: &SimulationResult) -> String {
    let original = result.original_decline_probability;
    let new = result.new_decline_probability;
    let delta = new - original;

    let mut explanation = format!("In the '{}' scenario, ", result.scenario_name);
    let changes = describe_changes(&result.parameter_changes);
    if !changes.is_empty() {
        explanation.push_str(&format!("with {}, ", changes.join(", ")));
    }

    if delta < -10.0 {
        explanation.push_str(&format!(
            "the decline risk significantly improves, dropping from {:.1}% to {:.1}%. This represents a favorable outcome with reduced collapse risk.",
            original, new
        ));
    } else if delta < 0.0 {
        explanation.push_str(&format!(
            "the decline risk slightly improves from {:.1}% to {:.1}%. This shows modest positive impact.",
            original, new
        ));
    } else if delta > 10.0 {
        explanation.push_str(&format!(
            "the decline risk significantly worsens, increasing from {:.1}% to {:.1}%. This scenario should be avoided.",
            original, new
        ));
    } else {
        explanation.push_str(&format!(
            "the decline risk remains relatively stable at {:.1}%. The changes have minimal impact.",
            new
        ));
    }
    explanation
}

fn describe_changes(changes: &ParameterChanges) -> Vec<String> {
    [
        ("engagement_boost", changes.engagement_boost),
        ("engagement_drop", changes.engagement_drop),
        ("sentiment_improvement", changes.sentiment_improvement),
        ("sentiment_decline", changes.sentiment_decline),
        ("influencer_boost", changes.influencer_boost),
        ("influencer_drop", changes.influencer_drop),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|value| format!("{} changes to {}", name, value)))
    .collect()
}

/// Prompt sent to the completion service.
pub fn narrative_prompt(prediction: &PredictionResult) -> String {
    let drivers: Vec<&str> = prediction
        .contributing_factors
        .iter()
        .take(3)
        .map(|factor| factor.factor.label())
        .collect();

    format!(
        "You are a social media trend analyst. Analyze this trend decline prediction and explain it clearly.\n\n\
Trend Analysis:\n\
- Decline Probability: {}%\n\
- Lifecycle Stage: {}\n\
- Risk Level: {}\n\
- Top Decline Drivers: {}\n\n\
Provide a concise business explanation (3-4 sentences) covering:\n\
1. Why the trend is declining\n\
2. Key decline drivers\n\
3. Business interpretation\n\
4. Strategic outlook\n\n\
Response:",
        prediction.decline_probability,
        prediction.lifecycle_stage,
        prediction.risk_level.label(),
        drivers.join(", ")
    )
}
